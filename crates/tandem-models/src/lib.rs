//! Model resolution, credentials and cache management for tandem
//!
//! Turns a model identifier into something a pipeline loader can open: either a
//! local pipeline config with validated weight paths, or a remote hub repository
//! together with the access token needed to fetch it.

pub mod config;
pub mod credentials;
pub mod error;
pub mod hub;
pub mod manager;
pub mod registry;
pub mod resolver;

pub use config::PipelineConfig;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ModelError;
pub use hub::{HfHub, ModelHub};
pub use manager::{default_cache_dir, DownloadProgress, ModelManager};
pub use registry::{
    ModelInfo, ModelType, DEFAULT_PIPELINE, DIARIZATION_MODELS, FALLBACK_PIPELINE, WHISPER_MODELS,
};
pub use resolver::{resolve, resolve_local, ModelSource, ResolvedModel};

pub use secrecy::{ExposeSecret, SecretString};
