//! Subcommand implementations

pub mod cut;
pub mod diarize;
pub mod models;
pub mod probe;
pub mod token;
#[cfg(feature = "whisper")]
pub mod transcribe;

use clap::Args;
use tandem_core::{DecoderBackend, LoaderConfig, DEFAULT_SAMPLE_RATE};

/// Audio decoding flags shared by subcommands
#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Decode in-process instead of through ffmpeg
    #[arg(long)]
    pub native_decoder: bool,

    /// Target sample rate (Hz)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Decoder thread hint (0 = decoder decides)
    #[arg(long, default_value_t = 0)]
    pub threads: u32,
}

impl DecodeArgs {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            sample_rate: self.sample_rate,
            backend: if self.native_decoder {
                DecoderBackend::Native
            } else {
                DecoderBackend::Ffmpeg
            },
            threads: self.threads,
            ..LoaderConfig::default()
        }
    }
}
