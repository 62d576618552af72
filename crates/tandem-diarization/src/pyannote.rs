//! ONNX diarization backend using pyannote-rs
//!
//! Segmentation finds speech turns, an embedding model fingerprints each turn,
//! and turns are clustered greedily by cosine similarity.

use std::path::{Path, PathBuf};

use tandem_core::{Device, Waveform, DEFAULT_SAMPLE_RATE};
use tandem_models::config::{lookup, read_hparams};
use tandem_models::registry::{EMBEDDING_MODEL_ID, SEGMENTATION_MODEL_ID};
use tandem_models::{
    ModelManager, ResolvedModel, SecretString, DEFAULT_PIPELINE, FALLBACK_PIPELINE,
};
use tracing::{debug, info, warn};

use crate::error::DiarizationError;
use crate::params::DiarizationParams;
use crate::pipeline::{DiarizationPipeline, LoadRequest, PipelineLoader};
use crate::trace::RawTrace;

/// Cosine similarity above which a turn joins an existing speaker
pub const DEFAULT_THRESHOLD: f32 = 0.6;

const ACCEPTED_PARAMS: &[&str] = &["num_speakers", "max_speakers", "threshold"];

/// Segmentation + embedding models on disk
pub struct PyannotePipeline {
    segmentation: PathBuf,
    embedding: PathBuf,
    threshold: f32,
    name: String,
}

impl PyannotePipeline {
    pub fn new(segmentation: PathBuf, embedding: PathBuf) -> Result<Self, DiarizationError> {
        for path in [&segmentation, &embedding] {
            if !path.is_file() {
                return Err(DiarizationError::FileNotFound(path.display().to_string()));
            }
        }

        let name = segmentation
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pyannote".to_string());

        Ok(Self {
            segmentation,
            embedding,
            threshold: DEFAULT_THRESHOLD,
            name,
        })
    }

    /// Default clustering threshold when the caller passes none
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl DiarizationPipeline for PyannotePipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted_params(&self) -> &[&'static str] {
        ACCEPTED_PARAMS
    }

    fn apply(
        &mut self,
        waveform: &Waveform,
        params: &DiarizationParams,
    ) -> Result<RawTrace, DiarizationError> {
        if waveform.sample_rate() != DEFAULT_SAMPLE_RATE {
            return Err(DiarizationError::InvalidAudioFormat(format!(
                "segmentation expects {} Hz audio, got {} Hz",
                DEFAULT_SAMPLE_RATE,
                waveform.sample_rate()
            )));
        }

        let threshold = params
            .get_f64("threshold")
            .map(|t| t as f32)
            .unwrap_or(self.threshold);
        let max_speakers = params.num_speakers().or(params.max_speakers());

        let samples = to_pcm16(waveform.samples());
        let segments = pyannote_rs::get_segments(&samples, waveform.sample_rate(), &self.segmentation)
            .map_err(|e| DiarizationError::OrtError(format!("Failed to run segmentation model: {}", e)))?;

        let mut extractor = pyannote_rs::EmbeddingExtractor::new(&self.embedding)
            .map_err(|e| DiarizationError::OrtError(format!("Failed to load embedding model: {}", e)))?;

        let mut speakers: Vec<(String, Vec<f32>)> = Vec::new();
        let mut trace = RawTrace::new();

        for (idx, segment) in segments.enumerate() {
            let segment = match segment {
                Ok(segment) => segment,
                Err(e) => {
                    debug!("Segment processing error: {}", e);
                    continue;
                }
            };

            let embedding: Vec<f32> = extractor
                .compute(&segment.samples)
                .map_err(|e| DiarizationError::InferenceFailed(format!("Failed to compute embedding: {}", e)))?
                .collect();

            let speaker = find_or_create_speaker(&embedding, &mut speakers, threshold, max_speakers);
            trace.push(segment.start, segment.end, idx.to_string(), speaker);
        }

        debug!("{} turns, {} speakers", trace.len(), speakers.len());
        Ok(trace)
    }
}

/// Builds [`PyannotePipeline`]s from local configs or the model registry
#[derive(Debug, Default, Clone, Copy)]
pub struct PyannoteLoader;

impl PipelineLoader for PyannoteLoader {
    async fn load(
        &self,
        request: &LoadRequest,
    ) -> Result<Option<Box<dyn DiarizationPipeline>>, DiarizationError> {
        if request.device != Device::Cpu {
            debug!("ONNX runtime picks its own execution provider; requested {}", request.device);
        }

        let manager = ModelManager::with_cache_dir(request.cache_dir.clone())?;

        let (segmentation, embedding, config_threshold) = match &request.model {
            ResolvedModel::Local {
                config_path,
                config,
                segmentation,
            } => {
                if !is_onnx(segmentation) {
                    warn!(
                        "{} is not an ONNX model; this backend cannot run it",
                        segmentation.display()
                    );
                    return Ok(None);
                }

                let base_dir = config_path.parent().unwrap_or(Path::new(""));
                let embedding = match config.embedding_path(base_dir) {
                    Some(path) => path,
                    None => download(&manager, EMBEDDING_MODEL_ID, None).await?,
                };
                let threshold = config
                    .hyperparameter("clustering.threshold")
                    .and_then(|v| v.as_f64());

                (segmentation.clone(), embedding, threshold)
            }
            ResolvedModel::Remote { repo_id, token } => {
                if repo_id != DEFAULT_PIPELINE && repo_id != FALLBACK_PIPELINE {
                    warn!("No ONNX export known for {}", repo_id);
                    return Ok(None);
                }

                let segmentation = download(&manager, SEGMENTATION_MODEL_ID, token.as_ref()).await?;
                let embedding = download(&manager, EMBEDDING_MODEL_ID, token.as_ref()).await?;
                (segmentation, embedding, None)
            }
        };

        let hparams_threshold = match &request.hparams_file {
            Some(path) => lookup(&read_hparams(path)?, "clustering.threshold").and_then(|v| v.as_f64()),
            None => None,
        };

        let threshold = hparams_threshold
            .or(config_threshold)
            .map(|t| t as f32)
            .unwrap_or(DEFAULT_THRESHOLD);

        info!(
            "Loading pyannote pipeline: segmentation={}, embedding={}, threshold={}",
            segmentation.display(),
            embedding.display(),
            threshold
        );

        let pipeline = PyannotePipeline::new(segmentation, embedding)?.with_threshold(threshold);
        Ok(Some(Box::new(pipeline)))
    }
}

async fn download(
    manager: &ModelManager,
    model_id: &str,
    token: Option<&SecretString>,
) -> Result<PathBuf, DiarizationError> {
    let path = manager
        .download_by_id(model_id, token, |progress| {
            debug!("{}: {} bytes", progress.model_id, progress.received);
        })
        .await?;
    Ok(path)
}

fn is_onnx(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"))
}

fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Find the closest existing speaker or create a new one
fn find_or_create_speaker(
    embedding: &[f32],
    speakers: &mut Vec<(String, Vec<f32>)>,
    threshold: f32,
    max_speakers: Option<u32>,
) -> String {
    let best_match = speakers
        .iter()
        .enumerate()
        .map(|(idx, (_, existing))| (idx, cosine_similarity(embedding, existing)))
        .filter(|(_, similarity)| *similarity > threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((idx, _)) = best_match {
        return speakers[idx].0.clone();
    }

    if let Some(max) = max_speakers {
        if max > 0 && speakers.len() >= max as usize {
            // assign to the closest speaker even below threshold
            if let Some((idx, _)) = speakers
                .iter()
                .enumerate()
                .map(|(i, (_, e))| (i, cosine_similarity(embedding, e)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
            {
                return speakers[idx].0.clone();
            }
        }
    }

    let label = format!("SPEAKER_{:02}", speakers.len());
    speakers.push((label.clone(), embedding.to_vec()));
    label
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_clustering_labels() {
        let mut speakers = Vec::new();
        assert_eq!(find_or_create_speaker(&[1.0, 0.0], &mut speakers, 0.6, None), "SPEAKER_00");
        assert_eq!(find_or_create_speaker(&[0.9, 0.1], &mut speakers, 0.6, None), "SPEAKER_00");
        assert_eq!(find_or_create_speaker(&[0.0, 1.0], &mut speakers, 0.6, None), "SPEAKER_01");
        assert_eq!(speakers.len(), 2);
    }

    #[test]
    fn test_speaker_cap() {
        let mut speakers = Vec::new();
        find_or_create_speaker(&[1.0, 0.0], &mut speakers, 0.6, Some(1));
        let label = find_or_create_speaker(&[0.0, 1.0], &mut speakers, 0.6, Some(1));
        assert_eq!(label, "SPEAKER_00");
        assert_eq!(speakers.len(), 1);
    }

    #[test]
    fn test_pcm16_conversion_clamps() {
        assert_eq!(to_pcm16(&[0.0, 1.0, -2.0]), vec![0, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_missing_model_files() {
        let err = PyannotePipeline::new(PathBuf::from("/nope/seg.onnx"), PathBuf::from("/nope/emb.onnx"));
        assert!(matches!(err, Err(DiarizationError::FileNotFound(_))));
    }
}
