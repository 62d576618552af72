//! Model registry with download information

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Hub pipeline tried first when no model is given
pub const DEFAULT_PIPELINE: &str = "pyannote/speaker-diarization-3.1";

/// Hub pipeline tried when the default is not reachable
pub const FALLBACK_PIPELINE: &str = "pyannote/speaker-diarization";

/// File name looked for next to a local config when its weights path is stale
pub const DEFAULT_WEIGHTS_FILE: &str = "pytorch_model.bin";

/// Registry ID of the ONNX segmentation model
pub const SEGMENTATION_MODEL_ID: &str = "pyannote-segmentation";

/// Registry ID of the ONNX speaker embedding model
pub const EMBEDDING_MODEL_ID: &str = "wespeaker-embedding";

/// Model type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Whisper ASR model
    Whisper,
    /// Pyannote segmentation model
    PyannoteSegmentation,
    /// Pyannote/wespeaker embedding model
    PyannoteEmbedding,
}

impl ModelType {
    /// Get the subdirectory name for this model type
    pub fn subdirectory(&self) -> &'static str {
        match self {
            ModelType::Whisper => "whisper",
            ModelType::PyannoteSegmentation => "pyannote",
            ModelType::PyannoteEmbedding => "pyannote",
        }
    }
}

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Model type
    pub model_type: ModelType,
    /// File name
    pub filename: String,
    /// Download URL
    pub url: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// SHA256 hash for verification (empty if unknown)
    pub sha256: String,
    /// Description
    pub description: String,
}

impl ModelInfo {
    /// Get human-readable size string
    pub fn size_string(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.1} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.0} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.0} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}

fn hub_model(
    id: &str,
    name: &str,
    model_type: ModelType,
    filename: &str,
    url: &str,
    size_bytes: u64,
    description: &str,
) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        model_type,
        filename: filename.to_string(),
        url: url.to_string(),
        size_bytes,
        sha256: String::new(),
        description: description.to_string(),
    }
}

/// Available Whisper models
pub static WHISPER_MODELS: LazyLock<Vec<ModelInfo>> = LazyLock::new(|| {
    const BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";
    vec![
        hub_model(
            "whisper-tiny",
            "Whisper Tiny",
            ModelType::Whisper,
            "ggml-tiny.bin",
            &format!("{}/ggml-tiny.bin", BASE),
            75_000_000,
            "Fastest, lowest accuracy (~75MB)",
        ),
        hub_model(
            "whisper-base",
            "Whisper Base",
            ModelType::Whisper,
            "ggml-base.bin",
            &format!("{}/ggml-base.bin", BASE),
            142_000_000,
            "Fast, good accuracy (~140MB)",
        ),
        hub_model(
            "whisper-small",
            "Whisper Small",
            ModelType::Whisper,
            "ggml-small.bin",
            &format!("{}/ggml-small.bin", BASE),
            466_000_000,
            "Balanced speed/accuracy (~460MB)",
        ),
        hub_model(
            "whisper-medium",
            "Whisper Medium",
            ModelType::Whisper,
            "ggml-medium.bin",
            &format!("{}/ggml-medium.bin", BASE),
            1_500_000_000,
            "High accuracy (~1.5GB)",
        ),
        hub_model(
            "whisper-large-v3",
            "Whisper Large V3",
            ModelType::Whisper,
            "ggml-large-v3.bin",
            &format!("{}/ggml-large-v3.bin", BASE),
            3_000_000_000,
            "Highest accuracy, slowest (~3GB)",
        ),
    ]
});

/// Available diarization models
pub static DIARIZATION_MODELS: LazyLock<Vec<ModelInfo>> = LazyLock::new(|| {
    vec![
        hub_model(
            SEGMENTATION_MODEL_ID,
            "Pyannote Segmentation 3.0",
            ModelType::PyannoteSegmentation,
            "segmentation-3.0.onnx",
            "https://huggingface.co/pyannote/segmentation-3.0/resolve/main/pytorch_model.onnx",
            17_000_000,
            "Speaker segmentation (~17MB)",
        ),
        hub_model(
            EMBEDDING_MODEL_ID,
            "WeSpeaker Embedding",
            ModelType::PyannoteEmbedding,
            "wespeaker-voxceleb-resnet34-LM.onnx",
            "https://huggingface.co/pyannote/wespeaker-voxceleb-resnet34-LM/resolve/main/pytorch_model.onnx",
            90_000_000,
            "Speaker embedding extraction (~90MB)",
        ),
    ]
});

/// Get model info by ID
pub fn get_model(id: &str) -> Option<ModelInfo> {
    WHISPER_MODELS
        .iter()
        .chain(DIARIZATION_MODELS.iter())
        .find(|m| m.id == id)
        .cloned()
}

/// Get all models of a specific type
pub fn get_models_by_type(model_type: ModelType) -> Vec<ModelInfo> {
    WHISPER_MODELS
        .iter()
        .chain(DIARIZATION_MODELS.iter())
        .filter(|m| m.model_type == model_type)
        .cloned()
        .collect()
}

/// Get all available models
pub fn get_all_models() -> Vec<ModelInfo> {
    WHISPER_MODELS
        .iter()
        .chain(DIARIZATION_MODELS.iter())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        let model = get_model(SEGMENTATION_MODEL_ID).unwrap();
        assert_eq!(model.model_type, ModelType::PyannoteSegmentation);
        assert!(get_model("nope").is_none());
    }

    #[test]
    fn test_models_by_type() {
        assert_eq!(get_models_by_type(ModelType::Whisper).len(), WHISPER_MODELS.len());
        assert_eq!(get_models_by_type(ModelType::PyannoteEmbedding).len(), 1);
    }

    #[test]
    fn test_size_string() {
        let model = get_model("whisper-medium").unwrap();
        assert_eq!(model.size_string(), "1.4 GB");
    }
}
