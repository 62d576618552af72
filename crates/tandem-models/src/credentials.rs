//! Access token storage
//!
//! One optional hub token persisted across calls. Stores are injected into the
//! resolver so tests can substitute an in-memory one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::ModelError;

/// Get/set a single access token
pub trait CredentialStore: Send + Sync {
    /// Stored token, or [`ModelError::CredentialNotFound`]
    fn get(&self) -> Result<SecretString, ModelError>;

    /// Replace the stored token
    fn set(&self, token: &SecretString) -> Result<(), ModelError>;

    /// Human-readable location for error messages
    fn location(&self) -> String;
}

/// Token kept in a single file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/hub_token` for this user
    pub fn default_location() -> Result<Self, ModelError> {
        let dirs = ProjectDirs::from("com", "tandem", "Tandem").ok_or_else(|| {
            ModelError::CacheDirectoryError("Could not determine config directory".to_string())
        })?;
        Ok(Self::new(dirs.config_dir().join("hub_token")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<SecretString, ModelError> {
        if !self.path.is_file() {
            return Err(ModelError::CredentialNotFound {
                path: self.location(),
            });
        }

        let token = fs::read_to_string(&self.path)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ModelError::CredentialNotFound {
                path: self.location(),
            });
        }

        debug!("Read access token from {}", self.path.display());
        Ok(SecretString::new(token.to_string()))
    }

    fn set(&self, token: &SecretString) -> Result<(), ModelError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, token.expose_secret())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Access token saved to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Token kept in memory for the life of the process
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<SecretString, ModelError> {
        let guard = self.token.lock().map_err(|_| ModelError::CredentialNotFound {
            path: self.location(),
        })?;
        guard
            .as_ref()
            .map(|t| SecretString::new(t.clone()))
            .ok_or_else(|| ModelError::CredentialNotFound {
                path: self.location(),
            })
    }

    fn set(&self, token: &SecretString) -> Result<(), ModelError> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.expose_secret().clone());
        }
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));

        let err = store.get().unwrap_err();
        assert!(matches!(err, ModelError::CredentialNotFound { .. }));
        let message = err.to_string();
        assert!(message.contains("huggingface.co/settings/tokens"));
        assert!(message.contains(&store.location()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("token"));

        store.set(&SecretString::new("hf_abc\n".to_string())).unwrap();
        assert_eq!(store.get().unwrap().expose_secret(), "hf_abc");
    }

    #[test]
    fn test_file_store_blank_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(store.get(), Err(ModelError::CredentialNotFound { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.get().is_err());

        store.set(&SecretString::new("secret".to_string())).unwrap();
        assert_eq!(store.get().unwrap().expose_secret(), "secret");
    }
}
