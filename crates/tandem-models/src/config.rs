//! Pipeline configuration files (YAML)
//!
//! A local pipeline is described by a config file whose `pipeline.params`
//! section names the segmentation (and optionally embedding) weights:
//!
//! ```yaml
//! version: 3.1.0
//! pipeline:
//!   name: pyannote.audio.pipelines.SpeakerDiarization
//!   params:
//!     segmentation: pytorch_model.bin
//!     embedding: wespeaker.onnx
//! params:
//!   clustering:
//!     threshold: 0.7
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yml::Value;

use crate::error::ModelError;

/// Parsed pipeline config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    pub pipeline: PipelineSection,
    /// Pipeline hyper-parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// `pipeline:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default)]
    pub name: String,
    pub params: PipelineParams,
}

/// `pipeline.params:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Segmentation weights (path or hub identifier)
    pub segmentation: String,
    /// Embedding weights (path or hub identifier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PipelineConfig {
    /// Read and parse a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|message| ModelError::InvalidConfig {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse YAML text
    pub fn parse(content: &str) -> Result<Self, String> {
        serde_yml::from_str(content).map_err(|e| e.to_string())
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yml::to_string(self).map_err(|e| e.to_string())
    }

    /// Configured segmentation path, relative paths taken from `base_dir`
    pub fn segmentation_path(&self, base_dir: &Path) -> PathBuf {
        resolve_relative(&self.pipeline.params.segmentation, base_dir)
    }

    /// Configured embedding path, relative paths taken from `base_dir`
    pub fn embedding_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.pipeline
            .params
            .embedding
            .as_deref()
            .map(|e| resolve_relative(e, base_dir))
    }

    pub fn set_segmentation(&mut self, path: &Path) {
        self.pipeline.params.segmentation = path.display().to_string();
    }

    /// Look up a hyper-parameter by dotted path, e.g. `clustering.threshold`
    pub fn hyperparameter(&self, dotted: &str) -> Option<&Value> {
        lookup(self.params.as_ref()?, dotted)
    }
}

/// Read a hyper-parameter file; its `params:` section when present, else the whole document
pub fn read_hparams<P: AsRef<Path>>(path: P) -> Result<Value, ModelError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let document: Value = serde_yml::from_str(&content).map_err(|e| ModelError::InvalidConfig {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(match document.get("params") {
        Some(params) => params.clone(),
        None => document,
    })
}

/// Dotted-path lookup in a YAML mapping
pub fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, key| current.get(key))
}

fn resolve_relative(value: &str, base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
version: 3.1.0
pipeline:
  name: pyannote.audio.pipelines.SpeakerDiarization
  params:
    clustering: AgglomerativeClustering
    embedding: wespeaker.onnx
    embedding_batch_size: 32
    segmentation: weights/segmentation.bin
params:
  clustering:
    method: centroid
    threshold: 0.7
"#;

    #[test]
    fn test_parse_config() {
        let config = PipelineConfig::parse(CONFIG).unwrap();
        assert_eq!(config.pipeline.params.segmentation, "weights/segmentation.bin");
        assert_eq!(config.pipeline.params.embedding.as_deref(), Some("wespeaker.onnx"));
        assert!(config.pipeline.params.extra.contains_key("embedding_batch_size"));
        assert_eq!(
            config.hyperparameter("clustering.threshold").and_then(Value::as_f64),
            Some(0.7)
        );
    }

    #[test]
    fn test_relative_paths_use_config_dir() {
        let config = PipelineConfig::parse(CONFIG).unwrap();
        let base = Path::new("/models/diarization");
        assert_eq!(
            config.segmentation_path(base),
            PathBuf::from("/models/diarization/weights/segmentation.bin")
        );
        assert_eq!(
            config.embedding_path(base),
            Some(PathBuf::from("/models/diarization/wespeaker.onnx"))
        );
    }

    #[test]
    fn test_missing_segmentation_is_invalid() {
        let err = PipelineConfig::parse("pipeline:\n  params: {}\n").unwrap_err();
        assert!(err.contains("segmentation"));
    }

    #[test]
    fn test_yaml_roundtrip_keeps_extra_keys() {
        let mut config = PipelineConfig::parse(CONFIG).unwrap();
        config.set_segmentation(Path::new("/abs/model.bin"));
        let reparsed = PipelineConfig::parse(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed.pipeline.params.segmentation, "/abs/model.bin");
        assert!(reparsed.pipeline.params.extra.contains_key("clustering"));
    }

    #[test]
    fn test_read_hparams_prefers_params_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hparams.yaml");
        fs::write(&path, "params:\n  clustering:\n    threshold: 0.5\n").unwrap();

        let hparams = read_hparams(&path).unwrap();
        assert_eq!(
            lookup(&hparams, "clustering.threshold").and_then(Value::as_f64),
            Some(0.5)
        );
    }
}
