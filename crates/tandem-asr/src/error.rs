//! ASR error types

use tandem_core::AudioError;
use thiserror::Error;

/// ASR-related errors
#[derive(Error, Debug)]
pub enum AsrError {
    /// Audio could not be loaded
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Model loading failed
    #[error("Failed to load model: {0}")]
    ModelLoadFailed(String),

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Transcription failed
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Invalid audio format
    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
