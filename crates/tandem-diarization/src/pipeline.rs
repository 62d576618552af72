//! Seams between the service and a diarization backend

use std::path::PathBuf;

use tandem_core::{Device, Waveform};
use tandem_models::ResolvedModel;

use crate::error::DiarizationError;
use crate::params::DiarizationParams;
use crate::trace::RawTrace;

/// A loaded diarization model
pub trait DiarizationPipeline: Send {
    /// Identifier for logs
    fn name(&self) -> &str;

    /// Parameter names `apply` understands
    fn accepted_params(&self) -> &[&'static str];

    /// Run the model over `waveform`, returning a chronological trace
    fn apply(
        &mut self,
        waveform: &Waveform,
        params: &DiarizationParams,
    ) -> Result<RawTrace, DiarizationError>;
}

/// Everything a loader needs to build a pipeline
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub model: ResolvedModel,
    /// Where downloaded weights are cached
    pub cache_dir: PathBuf,
    /// Optional YAML file overriding pipeline hyper-parameters
    pub hparams_file: Option<PathBuf>,
    pub device: Device,
}

/// Builds pipelines from resolved models
///
/// `Ok(None)` means the model resolved but yielded nothing usable.
#[trait_variant::make(PipelineLoader: Send)]
pub trait LocalPipelineLoader {
    async fn load(
        &self,
        request: &LoadRequest,
    ) -> Result<Option<Box<dyn DiarizationPipeline>>, DiarizationError>;
}
