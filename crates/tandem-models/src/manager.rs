//! Local cache of registry model files
//!
//! Files land at `<cache>/<kind>/<filename>`. A transfer streams into a
//! `.part` sibling and is hashed on the way in; only a verified file is moved
//! into place, so anything at the final path is complete.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ModelError;
use crate::registry::{self, ModelInfo};

/// Bytes received so far for one model file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub model_id: String,
    pub received: u64,
    /// From `Content-Length`, else the registry size; `None` if neither is known
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.received as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Downloads registry models into a cache directory and manages what is there
pub struct ModelManager {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl ModelManager {
    /// Manager over the per-user cache directory
    pub fn new() -> Result<Self, ModelError> {
        Self::with_cache_dir(default_cache_dir()?)
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tandem/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
        Ok(Self { cache_dir, client })
    }

    pub fn cache_directory(&self) -> &Path {
        &self.cache_dir
    }

    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.cache_dir
            .join(model.model_type.subdirectory())
            .join(&model.filename)
    }

    pub fn is_downloaded(&self, model: &ModelInfo) -> bool {
        self.model_path(model).is_file()
    }

    /// Fetch `model` unless it is already cached, returning its local path
    ///
    /// `token` is sent as a bearer token for gated hub files.
    pub async fn download<F>(
        &self,
        model: &ModelInfo,
        token: Option<&SecretString>,
        on_progress: F,
    ) -> Result<PathBuf, ModelError>
    where
        F: Fn(DownloadProgress) + Send + 'static,
    {
        let target = self.model_path(model);
        if target.is_file() {
            debug!("{} is cached at {}", model.id, target.display());
            return Ok(target);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!("Downloading {} from {}", model.id, model.url);
        let partial = partial_path(&target);

        let digest = match self.stream_to(model, token, &partial, on_progress).await {
            Ok(digest) => digest,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = verify_digest(model, &digest) {
            discard(&partial).await;
            return Err(e);
        }

        fs::rename(&partial, &target).await?;
        info!("Saved {} to {}", model.id, target.display());
        Ok(target)
    }

    /// [`download`](Self::download) by registry ID
    pub async fn download_by_id<F>(
        &self,
        model_id: &str,
        token: Option<&SecretString>,
        on_progress: F,
    ) -> Result<PathBuf, ModelError>
    where
        F: Fn(DownloadProgress) + Send + 'static,
    {
        let model = registry_entry(model_id)?;
        self.download(&model, token, on_progress).await
    }

    /// Remove a cached model; `false` when it was not cached
    pub async fn remove(&self, model_id: &str) -> Result<bool, ModelError> {
        let path = self.model_path(&registry_entry(model_id)?);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        info!("Removed {}", path.display());
        Ok(true)
    }

    /// Registry models present in the cache
    pub fn list_downloaded(&self) -> Vec<ModelInfo> {
        registry::get_all_models()
            .into_iter()
            .filter(|model| self.is_downloaded(model))
            .collect()
    }

    /// Bytes used by every file under the cache, leftovers included
    pub fn disk_usage(&self) -> u64 {
        WalkDir::new(&self.cache_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }

    pub async fn clear_cache(&self) -> Result<(), ModelError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir).await?;
            info!("Cleared {}", self.cache_dir.display());
        }
        Ok(())
    }

    /// Stream the response body into `partial`, returning its hex SHA-256
    async fn stream_to<F>(
        &self,
        model: &ModelInfo,
        token: Option<&SecretString>,
        partial: &Path,
        on_progress: F,
    ) -> Result<String, ModelError>
    where
        F: Fn(DownloadProgress) + Send,
    {
        let mut request = self.client.get(&model.url);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::DownloadFailed(format!(
                "{} returned HTTP {}",
                model.url, status
            )));
        }

        let total = response
            .content_length()
            .or(Some(model.size_bytes).filter(|size| *size > 0));

        let mut file = fs::File::create(partial).await?;
        let mut hasher = Sha256::new();
        let mut received = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            on_progress(DownloadProgress {
                model_id: model.id.clone(),
                received,
                total,
            });
        }

        file.flush().await?;
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Per-user model cache directory
pub fn default_cache_dir() -> Result<PathBuf, ModelError> {
    let dirs = ProjectDirs::from("com", "tandem", "Tandem").ok_or_else(|| {
        ModelError::CacheDirectoryError("Could not determine cache directory".to_string())
    })?;
    Ok(dirs.cache_dir().join("models"))
}

fn registry_entry(model_id: &str) -> Result<ModelInfo, ModelError> {
    registry::get_model(model_id).ok_or_else(|| ModelError::ModelNotFound(model_id.to_string()))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

/// An empty registry checksum skips verification
fn verify_digest(model: &ModelInfo, actual: &str) -> Result<(), ModelError> {
    if model.sha256.is_empty() || model.sha256.eq_ignore_ascii_case(actual) {
        return Ok(());
    }
    Err(ModelError::VerificationFailed {
        expected: model.sha256.clone(),
        actual: actual.to_string(),
    })
}

async fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", partial.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelType;

    fn test_model() -> ModelInfo {
        ModelInfo {
            id: "test".to_string(),
            name: "Test".to_string(),
            model_type: ModelType::Whisper,
            filename: "test.bin".to_string(),
            url: "http://127.0.0.1:9/test.bin".to_string(),
            size_bytes: 1000,
            sha256: String::new(),
            description: "Test model".to_string(),
        }
    }

    #[test]
    fn test_model_path() {
        let manager = ModelManager::with_cache_dir(PathBuf::from("/tmp/test")).unwrap();
        let path = manager.model_path(&test_model());
        assert_eq!(path, PathBuf::from("/tmp/test/whisper/test.bin"));
        assert_eq!(partial_path(&path), PathBuf::from("/tmp/test/whisper/test.bin.part"));
    }

    #[test]
    fn test_progress_fraction() {
        let progress = DownloadProgress {
            model_id: "m".to_string(),
            received: 250,
            total: Some(1000),
        };
        assert_eq!(progress.fraction(), Some(0.25));

        let unknown = DownloadProgress {
            total: None,
            ..progress.clone()
        };
        assert_eq!(unknown.fraction(), None);

        let empty = DownloadProgress {
            total: Some(0),
            ..progress
        };
        assert_eq!(empty.fraction(), None);
    }

    #[test]
    fn test_verify_digest() {
        let mut model = test_model();
        assert!(verify_digest(&model, "abc").is_ok());

        model.sha256 = "ABCDEF".to_string();
        assert!(verify_digest(&model, "abcdef").is_ok());
        assert!(matches!(
            verify_digest(&model, "123456"),
            Err(ModelError::VerificationFailed { expected, actual })
                if expected == "ABCDEF" && actual == "123456"
        ));
    }

    #[tokio::test]
    async fn test_cached_model_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf()).unwrap();
        let model = test_model();

        let cached = manager.model_path(&model);
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"weights").unwrap();

        let path = manager.download(&model, None, |_| {}).await.unwrap();
        assert_eq!(path, cached);
        assert_eq!(manager.disk_usage(), 7);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf()).unwrap();
        let model = test_model();

        let err = manager.download(&model, None, |_| {}).await.unwrap_err();
        assert!(matches!(err, ModelError::DownloadFailed(_)));

        let target = manager.model_path(&model);
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let manager = ModelManager::with_cache_dir(PathBuf::from("/tmp/none")).unwrap();
        let err = manager.download_by_id("missing", None, |_| {}).await.unwrap_err();
        assert!(matches!(err, ModelError::ModelNotFound(_)));
        assert!(matches!(
            manager.remove("missing").await,
            Err(ModelError::ModelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_reports_whether_cached() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf()).unwrap();
        let model = registry::get_all_models().remove(0);

        assert!(!manager.remove(&model.id).await.unwrap());

        let path = manager.model_path(&model);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"w").unwrap();
        assert_eq!(manager.list_downloaded().len(), 1);

        assert!(manager.remove(&model.id).await.unwrap());
        assert!(manager.list_downloaded().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("models");
        std::fs::create_dir_all(cache.join("whisper")).unwrap();
        std::fs::write(cache.join("whisper").join("stray.bin.part"), b"abc").unwrap();

        let manager = ModelManager::with_cache_dir(cache.clone()).unwrap();
        assert_eq!(manager.disk_usage(), 3);
        manager.clear_cache().await.unwrap();
        assert!(!cache.exists());
        assert_eq!(manager.disk_usage(), 0);
    }
}
