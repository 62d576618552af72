//! tandem command-line interface
//!
//! Speaker diarization (who spoke when) and transcription for audio files.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about = "Speaker diarization and transcription", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find who spoke when in an audio file
    Diarize(commands::diarize::DiarizeArgs),

    /// Extract a time range of an audio file to WAV
    Cut(commands::cut::CutArgs),

    /// Show audio file metadata
    Probe(commands::probe::ProbeArgs),

    /// Manage the model hub access token
    Token {
        #[command(subcommand)]
        action: commands::token::TokenCommand,
    },

    /// Manage downloaded model files
    Models(commands::models::ModelsArgs),

    /// Transcribe speech, optionally attributing speakers
    #[cfg(feature = "whisper")]
    Transcribe(commands::transcribe::TranscribeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Diarize(args) => commands::diarize::run(args).await,
        Commands::Cut(args) => commands::cut::run(args).await,
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Token { action } => commands::token::run(action).await,
        Commands::Models(args) => commands::models::run(args).await,
        #[cfg(feature = "whisper")]
        Commands::Transcribe(args) => commands::transcribe::run(args).await,
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diarize_flags() {
        let cli = Cli::try_parse_from([
            "tandem",
            "diarize",
            "talk.mp3",
            "--model",
            "org/pipeline",
            "--param",
            "num_speakers=2",
            "--format",
            "rttm",
            "--device",
            "cpu",
        ])
        .unwrap();

        match cli.command {
            Commands::Diarize(args) => {
                assert_eq!(args.model.as_deref(), Some("org/pipeline"));
                assert_eq!(args.params, vec!["num_speakers=2"]);
                assert!(!args.decode.native_decoder);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
