//! Resolve a model source to something a pipeline loader can open
//!
//! Local sources are YAML configs whose segmentation weights are validated on
//! disk. Remote sources are hub identifiers checked for existence, primary
//! first, then the fallback.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::credentials::CredentialStore;
use crate::error::ModelError;
use crate::hub::ModelHub;
use crate::registry::{DEFAULT_PIPELINE, DEFAULT_WEIGHTS_FILE, FALLBACK_PIPELINE};

/// Where a diarization pipeline comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Config file on disk
    Local(PathBuf),
    /// Hub identifier with an optional secondary identifier
    Remote {
        primary: String,
        fallback: Option<String>,
    },
}

impl ModelSource {
    /// Interpret user input: anything path-like is local, the rest a hub identifier
    pub fn parse(value: &str) -> Self {
        if looks_like_path(value) {
            Self::Local(expand_home(value))
        } else {
            Self::Remote {
                primary: value.to_string(),
                fallback: None,
            }
        }
    }

    pub fn remote(primary: impl Into<String>, fallback: Option<String>) -> Self {
        Self::Remote {
            primary: primary.into(),
            fallback,
        }
    }

    /// Replace the secondary identifier of a remote source
    pub fn with_fallback(self, fallback: impl Into<String>) -> Self {
        match self {
            Self::Remote { primary, .. } => Self::Remote {
                primary,
                fallback: Some(fallback.into()),
            },
            local => local,
        }
    }
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::remote(DEFAULT_PIPELINE, Some(FALLBACK_PIPELINE.to_string()))
    }
}

/// Outcome of resolution
#[derive(Debug, Clone)]
pub enum ResolvedModel {
    Local {
        config_path: PathBuf,
        /// Config with the segmentation path pointing at an existing file
        config: PipelineConfig,
        segmentation: PathBuf,
    },
    Remote {
        repo_id: String,
        token: Option<SecretString>,
    },
}

impl ResolvedModel {
    /// Config path or hub identifier, for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Local { config_path, .. } => config_path.display().to_string(),
            Self::Remote { repo_id, .. } => repo_id.clone(),
        }
    }
}

/// Resolve a model source
///
/// `token` is the caller-supplied access token. When the primary identifier is
/// absent, the fallback is checked with the supplied or stored token. Only once
/// it exists is a supplied token persisted (if `cache_token` is set) or a
/// stored one required.
pub async fn resolve<H: ModelHub>(
    source: &ModelSource,
    hub: &H,
    credentials: &dyn CredentialStore,
    token: Option<SecretString>,
    cache_token: bool,
) -> Result<ResolvedModel, ModelError> {
    let (primary, fallback) = match source {
        ModelSource::Local(path) => return resolve_local(path),
        ModelSource::Remote { primary, fallback } => (primary, fallback),
    };

    if hub.model_exists(primary, token.as_ref()).await? {
        info!("Resolved model {} on hub", primary);
        return Ok(ResolvedModel::Remote {
            repo_id: primary.clone(),
            token,
        });
    }

    let Some(fallback) = fallback else {
        return Err(ModelError::ModelNotFound(format!(
            "{} was not found on the model hub",
            primary
        )));
    };

    info!("{} not found on hub, trying {}", primary, fallback);

    let stored = match &token {
        Some(_) => None,
        None => stored_token(credentials)?,
    };

    if !hub.model_exists(fallback, token.as_ref().or(stored.as_ref())).await? {
        return Err(ModelError::ModelNotFound(format!(
            "neither {} nor {} was found on the model hub",
            primary, fallback
        )));
    }

    let token = match (token, stored) {
        (Some(token), _) => {
            if cache_token {
                credentials.set(&token)?;
            }
            token
        }
        (None, Some(stored)) => stored,
        (None, None) => {
            return Err(ModelError::CredentialNotFound {
                path: credentials.location(),
            })
        }
    };

    info!("Resolved model {} on hub", fallback);
    Ok(ResolvedModel::Remote {
        repo_id: fallback.clone(),
        token: Some(token),
    })
}

/// Stored token if there is one; other store failures propagate
fn stored_token(credentials: &dyn CredentialStore) -> Result<Option<SecretString>, ModelError> {
    match credentials.get() {
        Ok(token) => Ok(Some(token)),
        Err(ModelError::CredentialNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolve a local config, falling back through nearby weights files
///
/// Order: configured segmentation path, `pytorch_model.bin` next to the
/// config, then the only `*.bin` file in the config's directory.
pub fn resolve_local(config_path: &Path) -> Result<ResolvedModel, ModelError> {
    if !config_path.is_file() {
        return Err(ModelError::ModelNotFound(format!(
            "No local model or directory found at {}",
            config_path.display()
        )));
    }

    let mut config = PipelineConfig::from_file(config_path)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let configured = config.segmentation_path(&base_dir);
    if configured.is_file() {
        debug!("Segmentation weights at {}", configured.display());
        return Ok(ResolvedModel::Local {
            config_path: config_path.to_path_buf(),
            config,
            segmentation: configured,
        });
    }

    warn!(
        "Model not found at {}. Trying to find it next to the config file.",
        configured.display()
    );

    let default_path = base_dir.join(DEFAULT_WEIGHTS_FILE);
    let segmentation = if default_path.is_file() {
        default_path
    } else {
        warn!(
            "Model not found at {}. Searching {} for .bin files.",
            default_path.display(),
            base_dir.display()
        );

        let candidates = bin_files(&base_dir);
        match candidates.as_slice() {
            [only] => only.clone(),
            _ => {
                return Err(ModelError::ModelNotFound(format!(
                    "segmentation weights not found at {} or {}; found {} .bin files in {} (need exactly one)",
                    configured.display(),
                    default_path.display(),
                    candidates.len(),
                    base_dir.display()
                )));
            }
        }
    };

    warn!("Using segmentation weights at {}", segmentation.display());
    config.set_segmentation(&segmentation);

    Ok(ResolvedModel::Local {
        config_path: config_path.to_path_buf(),
        config,
        segmentation,
    })
}

fn bin_files(dir: &Path) -> Vec<PathBuf> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    files.sort();
    files
}

fn looks_like_path(value: &str) -> bool {
    Path::new(value).exists()
        || value.ends_with(".yaml")
        || value.ends_with(".yml")
        || value.starts_with('/')
        || value.starts_with("./")
        || value.starts_with("../")
        || value.starts_with('~')
        || value.contains('\\')
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(value)
}
