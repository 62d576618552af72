//! `tandem cut`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tandem_core::{AudioProcessor, Device, DevicePreference};
use tracing::info;

use super::DecodeArgs;

#[derive(Args, Debug)]
pub struct CutArgs {
    /// Audio file
    pub audio: PathBuf,

    /// Start time (seconds)
    pub start: f64,

    /// End time (seconds)
    pub end: f64,

    /// Output WAV file
    pub output: PathBuf,

    /// Output bit depth (16, 24 or 32)
    #[arg(long, default_value_t = 16)]
    pub bits: u16,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

pub async fn run(args: CutArgs) -> Result<()> {
    let config = args.decode.loader_config();
    let audio = args.audio.clone();

    let processor = tokio::task::spawn_blocking(move || {
        AudioProcessor::from_file(&audio, &config, DevicePreference::Explicit(Device::Cpu))
    })
    .await
    .context("decode task panicked")?
    .with_context(|| format!("Failed to load {}", args.audio.display()))?;

    info!("Loaded {}", processor);

    let clip = processor.cut(args.start, args.end);
    clip.save_wav(&args.output, args.bits)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Wrote {:.3}s ({} samples) to {}",
        clip.duration(),
        clip.len(),
        args.output.display()
    );
    Ok(())
}
