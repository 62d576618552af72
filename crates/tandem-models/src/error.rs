//! Model management error types

use thiserror::Error;

/// Model management errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// No usable local config and no resolvable remote identifier
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The model resolved but no usable pipeline could be built from it
    #[error("Unable to load model {0}. Check your access token or your local model path.")]
    LoadFailed(String),

    /// Token requested before one was stored
    #[error(
        "No access token found at {path}. Create a token at \
         https://huggingface.co/settings/tokens and save it with `tandem token set <TOKEN>`."
    )]
    CredentialNotFound { path: String },

    /// Pipeline config could not be parsed
    #[error("Invalid pipeline config {path}: {message}")]
    InvalidConfig { path: String, message: String },

    /// Hub request failed
    #[error("Model hub request failed: {0}")]
    HubRequestFailed(String),

    /// Download failed
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Verification failed
    #[error("Model verification failed: expected {expected}, got {actual}")]
    VerificationFailed { expected: String, actual: String },

    /// Cache directory error
    #[error("Failed to access cache directory: {0}")]
    CacheDirectoryError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}
