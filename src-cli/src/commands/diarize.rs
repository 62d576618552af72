//! `tandem diarize`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tandem_core::{AudioLoader, DevicePreference, ExportFormat, Exporter};
use tandem_diarization::{DiarizationParams, DiarizationService, LoadOptions};
use tandem_models::{CredentialStore, FileCredentialStore, HfHub, ModelSource, SecretString};
use tracing::info;

use super::DecodeArgs;

#[derive(Args, Debug)]
pub struct DiarizeArgs {
    /// Audio file
    pub audio: PathBuf,

    /// Pipeline config file or hub identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Hub identifier tried when the model is not found
    #[arg(long)]
    pub fallback_model: Option<String>,

    /// Hub access token
    #[arg(long)]
    pub token: Option<String>,

    /// Save --token for later runs when the fallback model is used
    #[arg(long)]
    pub cache_token: bool,

    /// Model cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Hyper-parameter YAML file
    #[arg(long)]
    pub hparams: Option<PathBuf>,

    /// Compute device: auto, cpu, cuda[:N] or metal
    #[arg(long, default_value = "auto")]
    pub device: DevicePreference,

    /// Pipeline parameter, repeatable (e.g. num_speakers=2)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Rttm,
    Audacity,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Rttm => ExportFormat::Rttm,
            OutputFormat::Audacity => ExportFormat::Audacity,
        }
    }
}

impl DiarizeArgs {
    fn load_options(&self) -> LoadOptions {
        let source = match &self.model {
            Some(model) => ModelSource::parse(model),
            None => ModelSource::default(),
        };
        let source = match &self.fallback_model {
            Some(fallback) => source.with_fallback(fallback.clone()),
            None => source,
        };

        LoadOptions {
            source,
            token: self.token.clone().map(SecretString::new),
            cache_token: self.cache_token,
            cache_dir: self.cache_dir.clone(),
            hparams_file: self.hparams.clone(),
            device: self.device,
        }
    }

    fn params(&self) -> Result<DiarizationParams> {
        let mut params = DiarizationParams::new();
        for assignment in &self.params {
            params.insert_assignment(assignment).map_err(anyhow::Error::msg)?;
        }
        Ok(params)
    }
}

pub async fn run(args: DiarizeArgs) -> Result<()> {
    let params = args.params()?;
    let options = args.load_options();

    let credentials = FileCredentialStore::default_location()?;
    let hub = HfHub::new()?;

    let service = load_service(options, &hub, &credentials)
        .await
        .context("Failed to load diarization pipeline")?
        .with_audio_loader(AudioLoader::new(args.decode.loader_config()));

    let audio = args.audio.clone();
    let output = tokio::task::spawn_blocking(move || {
        let mut service = service;
        service.diarize_file(&audio, &params)
    })
    .await
    .context("diarization task panicked")?
    .with_context(|| format!("Failed to diarize {}", args.audio.display()))?;

    let uri = recording_uri(&args.audio);
    let format = ExportFormat::from(args.format);

    match &args.output {
        Some(path) => {
            Exporter::write(&output, &uri, format, path)?;
            info!("Wrote {} segments to {}", output.len(), path.display());
        }
        None => println!("{}", Exporter::render(&output, &uri, format)?),
    }

    Ok(())
}

#[cfg(feature = "pyannote")]
async fn load_service(
    options: LoadOptions,
    hub: &HfHub,
    credentials: &dyn CredentialStore,
) -> Result<DiarizationService> {
    let loader = tandem_diarization::PyannoteLoader;
    Ok(DiarizationService::load(options, &loader, hub, credentials).await?)
}

#[cfg(not(feature = "pyannote"))]
async fn load_service(
    options: LoadOptions,
    hub: &HfHub,
    credentials: &dyn CredentialStore,
) -> Result<DiarizationService> {
    // resolution still runs so configuration and token problems surface first
    tandem_models::resolve(
        &options.source,
        hub,
        credentials,
        options.token,
        options.cache_token,
    )
    .await?;
    anyhow::bail!("this build has no diarization backend; rebuild with `--features pyannote`")
}

fn recording_uri(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}
