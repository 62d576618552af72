//! Diarization error types

use tandem_core::AudioError;
use tandem_models::ModelError;
use thiserror::Error;

/// Diarization-related errors
#[derive(Error, Debug)]
pub enum DiarizationError {
    /// Audio could not be loaded or has the wrong shape
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Model resolution, credentials or download failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The pipeline failed while running
    #[error("Diarization failed: {0}")]
    InferenceFailed(String),

    /// Invalid audio format
    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    /// ONNX Runtime error
    #[error("ONNX Runtime error: {0}")]
    OrtError(String),

    /// No speakers detected
    #[error("No speakers detected in audio")]
    NoSpeakersDetected,
}
