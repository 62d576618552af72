//! `tandem probe`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tandem_core::{AudioLoader, LoaderConfig};

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Audio file
    pub audio: PathBuf,
}

pub fn run(args: ProbeArgs) -> Result<()> {
    let info = AudioLoader::new(LoaderConfig::default())
        .probe(&args.audio)
        .with_context(|| format!("Failed to read {}", args.audio.display()))?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
