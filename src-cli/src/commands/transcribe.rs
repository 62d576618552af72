//! `tandem transcribe`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tandem_asr::{Transcriber, TranscriptionOptions, WhisperTranscriber};
use tandem_core::{AudioLoader, DiarizationOutput, DEFAULT_SAMPLE_RATE};
use tandem_diarization::{assign_speakers, merge_consecutive_speaker_segments};
use tandem_models::registry::get_model;
use tandem_models::ModelManager;
use tracing::info;

use super::DecodeArgs;

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Audio file
    pub audio: PathBuf,

    /// GGML model file or registry ID (e.g. whisper-base)
    #[arg(short, long)]
    pub model: String,

    /// Language code; auto-detected when omitted
    #[arg(short, long)]
    pub language: Option<String>,

    /// Skip word-level timestamps
    #[arg(long)]
    pub no_word_timestamps: bool,

    /// Diarization JSON from `tandem diarize` to label speakers
    #[arg(long)]
    pub diarization: Option<PathBuf>,

    /// Join same-speaker segments closer than this (seconds)
    #[arg(long, default_value_t = 1.0)]
    pub merge_gap: f64,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

pub async fn run(args: TranscribeArgs) -> Result<()> {
    let model_path = model_file(&args.model)?;

    let diarization: Option<DiarizationOutput> = match &args.diarization {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(serde_json::from_str(&json).context("Invalid diarization JSON")?)
        }
        None => None,
    };

    let mut config = args.decode.loader_config();
    config.sample_rate = DEFAULT_SAMPLE_RATE;

    let options = TranscriptionOptions {
        language: args.language.clone(),
        word_timestamps: !args.no_word_timestamps,
        threads: args.decode.threads,
    };

    let audio = args.audio.clone();
    let transcript = tokio::task::spawn_blocking(move || -> Result<_> {
        let waveform = AudioLoader::new(config).load(&audio)?;
        let mut transcriber = WhisperTranscriber::load(&model_path)?;
        Ok(transcriber.transcribe(&waveform, &options)?)
    })
    .await
    .context("transcription task panicked")?
    .with_context(|| format!("Failed to transcribe {}", args.audio.display()))?;

    let transcript = match &diarization {
        Some(diarization) => merge_consecutive_speaker_segments(
            assign_speakers(transcript, diarization)?,
            args.merge_gap,
        ),
        None => transcript,
    };

    let json = serde_json::to_string_pretty(&transcript)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Wrote {} segments to {}", transcript.segments.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn model_file(model: &str) -> Result<PathBuf> {
    let path = Path::new(model);
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    let info = get_model(model).with_context(|| format!("{} is neither a file nor a known model ID", model))?;
    let manager = ModelManager::new()?;
    anyhow::ensure!(
        manager.is_downloaded(&info),
        "{} is not downloaded; run `tandem models download {}`",
        model,
        model
    );
    Ok(manager.model_path(&info))
}
