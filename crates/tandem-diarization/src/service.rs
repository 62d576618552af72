//! Diarization service: one loaded pipeline plus output normalization

use std::path::{Path, PathBuf};

use tandem_core::{AudioLoader, Device, DevicePreference, DiarizationOutput, LoaderConfig, Waveform};
use tandem_models::{
    default_cache_dir, resolve, CredentialStore, ModelError, ModelHub, ModelSource, SecretString,
};
use tracing::{debug, info};

use crate::error::DiarizationError;
use crate::normalizer::normalize_trace;
use crate::params::DiarizationParams;
use crate::pipeline::{DiarizationPipeline, LoadRequest, PipelineLoader};

/// How to acquire a pipeline
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub source: ModelSource,
    /// Access token for the hub
    pub token: Option<SecretString>,
    /// Persist `token` when the fallback identifier is used
    pub cache_token: bool,
    /// Weights cache; the per-user cache directory when unset
    pub cache_dir: Option<PathBuf>,
    pub hparams_file: Option<PathBuf>,
    pub device: DevicePreference,
}

/// Holds one loaded pipeline
///
/// Not reentrant: `diarize` takes `&mut self`, callers serialize access.
pub struct DiarizationService {
    pipeline: Box<dyn DiarizationPipeline>,
    audio: AudioLoader,
    device: Device,
}

impl DiarizationService {
    /// Wrap an already loaded pipeline
    pub fn new(pipeline: Box<dyn DiarizationPipeline>) -> Self {
        Self {
            pipeline,
            audio: AudioLoader::new(LoaderConfig::default()),
            device: DevicePreference::Auto.resolve(),
        }
    }

    /// Resolve `options.source` and load it with `loader`
    pub async fn load<L, H>(
        options: LoadOptions,
        loader: &L,
        hub: &H,
        credentials: &dyn CredentialStore,
    ) -> Result<Self, DiarizationError>
    where
        L: PipelineLoader,
        H: ModelHub,
    {
        let device = options.device.resolve();
        info!("Loading diarization pipeline on {}", device);
        debug!("Load options: {:?}", options);

        let model = resolve(
            &options.source,
            hub,
            credentials,
            options.token,
            options.cache_token,
        )
        .await?;
        let described = model.describe();

        let cache_dir = match options.cache_dir {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };

        let request = LoadRequest {
            model,
            cache_dir,
            hparams_file: options.hparams_file,
            device,
        };

        let pipeline = loader
            .load(&request)
            .await?
            .ok_or(ModelError::LoadFailed(described))?;

        info!("Diarization pipeline {} ready", pipeline.name());
        Ok(Self {
            pipeline,
            audio: AudioLoader::new(LoaderConfig::default()),
            device,
        })
    }

    /// Use a different audio loader for [`diarize_file`](Self::diarize_file)
    pub fn with_audio_loader(mut self, audio: AudioLoader) -> Self {
        self.audio = audio;
        self
    }

    pub fn pipeline_name(&self) -> &str {
        self.pipeline.name()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn audio_loader(&self) -> &AudioLoader {
        &self.audio
    }

    /// Diarize a waveform
    ///
    /// Parameters the pipeline does not declare are dropped before it runs.
    pub fn diarize(
        &mut self,
        waveform: &Waveform,
        params: &DiarizationParams,
    ) -> Result<DiarizationOutput, DiarizationError> {
        let filtered = params.filter(self.pipeline.accepted_params());

        info!(
            "Diarizing {:.1}s of audio with {}",
            waveform.duration(),
            self.pipeline.name()
        );
        debug!("Parameters: {:?}", filtered);

        let trace = self.pipeline.apply(waveform, &filtered)?;
        let output = normalize_trace(&trace);

        info!(
            "Diarization completed: {} trace entries -> {} segments, {} speakers",
            trace.len(),
            output.len(),
            output.unique_speakers().len()
        );
        Ok(output)
    }

    /// Load an audio file with the service's loader, then diarize it
    pub fn diarize_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        params: &DiarizationParams,
    ) -> Result<DiarizationOutput, DiarizationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DiarizationError::FileNotFound(path.display().to_string()));
        }

        let waveform = self.audio.load(path)?;
        self.diarize(&waveform, params)
    }
}

impl std::fmt::Debug for DiarizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DiarizationService(pipeline={}, device={})", self.pipeline.name(), self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::RawTrace;
    use std::sync::{Arc, Mutex};
    use tandem_core::DecoderBackend;
    use tandem_models::{MemoryCredentialStore, ResolvedModel};

    /// Replays a fixed trace and records the parameters it was given
    struct ScriptedPipeline {
        trace: RawTrace,
        seen: Arc<Mutex<Vec<DiarizationParams>>>,
    }

    impl DiarizationPipeline for ScriptedPipeline {
        fn name(&self) -> &str {
            "scripted"
        }

        fn accepted_params(&self) -> &[&'static str] {
            &["num_speakers", "min_speakers", "max_speakers"]
        }

        fn apply(
            &mut self,
            _waveform: &Waveform,
            params: &DiarizationParams,
        ) -> Result<RawTrace, DiarizationError> {
            self.seen.lock().unwrap().push(params.clone());
            Ok(self.trace.clone())
        }
    }

    fn scripted(trace: RawTrace) -> (ScriptedPipeline, Arc<Mutex<Vec<DiarizationParams>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            ScriptedPipeline {
                trace,
                seen: seen.clone(),
            },
            seen,
        )
    }

    fn jittery_trace() -> RawTrace {
        let mut trace = RawTrace::new();
        trace.push(0.0, 1.0, "0", "SPEAKER_00");
        trace.push(1.0, 2.0, "1", "SPEAKER_00");
        trace.push(2.0, 3.5, "2", "SPEAKER_01");
        trace.push(3.5, 4.0, "3", "SPEAKER_00");
        trace
    }

    struct AnyHub;

    impl ModelHub for AnyHub {
        async fn model_exists(
            &self,
            _repo_id: &str,
            _token: Option<&SecretString>,
        ) -> Result<bool, ModelError> {
            Ok(true)
        }
    }

    /// Loader that yields a scripted pipeline, or nothing
    struct FakeLoader {
        usable: bool,
        requests: Mutex<Vec<LoadRequest>>,
    }

    impl PipelineLoader for FakeLoader {
        async fn load(
            &self,
            request: &LoadRequest,
        ) -> Result<Option<Box<dyn DiarizationPipeline>>, DiarizationError> {
            self.requests.lock().unwrap().push(request.clone());
            if !self.usable {
                return Ok(None);
            }
            let (pipeline, _) = scripted(jittery_trace());
            Ok(Some(Box::new(pipeline)))
        }
    }

    fn waveform() -> Waveform {
        Waveform::new(vec![0.0; 16000 * 4], 16000u32).unwrap()
    }

    #[test]
    fn test_diarize_filters_params_and_normalizes() {
        let (pipeline, seen) = scripted(jittery_trace());
        let mut service = DiarizationService::new(Box::new(pipeline));

        let params = DiarizationParams::new()
            .with("num_speakers", 2)
            .with("language", "en");
        let output = service.diarize(&waveform(), &params).unwrap();

        assert_eq!(output.speakers, vec!["SPEAKER_00", "SPEAKER_01", "SPEAKER_00"]);
        assert_eq!(output.segments, vec![[0.0, 2.0], [2.0, 3.5], [3.5, 4.0]]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].num_speakers(), Some(2));
        assert!(!seen[0].contains("language"));
    }

    #[test]
    fn test_empty_trace_gives_empty_output() {
        let (pipeline, _) = scripted(RawTrace::new());
        let mut service = DiarizationService::new(Box::new(pipeline));
        let output = service.diarize(&waveform(), &DiarizationParams::new()).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_diarize_file_loads_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        Waveform::new(vec![0.1; 8000], 8000u32)
            .unwrap()
            .save_wav(&path, 16)
            .unwrap();

        let (pipeline, _) = scripted(jittery_trace());
        let loader = AudioLoader::new(LoaderConfig {
            backend: DecoderBackend::Native,
            ..LoaderConfig::default()
        });
        let mut service = DiarizationService::new(Box::new(pipeline)).with_audio_loader(loader);

        let output = service.diarize_file(&path, &DiarizationParams::new()).unwrap();
        assert_eq!(output.len(), 3);

        let missing = service.diarize_file(dir.path().join("missing.wav"), &DiarizationParams::new());
        assert!(matches!(missing, Err(DiarizationError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_passes_request_to_loader() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader {
            usable: true,
            requests: Mutex::new(Vec::new()),
        };
        let options = LoadOptions {
            source: ModelSource::remote("org/pipeline", None),
            cache_dir: Some(dir.path().to_path_buf()),
            device: DevicePreference::Explicit(Device::Cpu),
            ..LoadOptions::default()
        };

        let mut service = DiarizationService::load(options, &loader, &AnyHub, &MemoryCredentialStore::new())
            .await
            .unwrap();
        assert_eq!(service.pipeline_name(), "scripted");
        assert_eq!(service.device(), Device::Cpu);

        {
            let requests = loader.requests.lock().unwrap();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].cache_dir, dir.path());
            assert!(matches!(
                &requests[0].model,
                ResolvedModel::Remote { repo_id, .. } if repo_id == "org/pipeline"
            ));
        }

        let output = service.diarize(&waveform(), &DiarizationParams::new()).unwrap();
        assert_eq!(output.len(), 3);
    }

    #[tokio::test]
    async fn test_unusable_pipeline_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader {
            usable: false,
            requests: Mutex::new(Vec::new()),
        };
        let options = LoadOptions {
            source: ModelSource::remote("org/pipeline", None),
            cache_dir: Some(dir.path().to_path_buf()),
            ..LoadOptions::default()
        };

        let err = DiarizationService::load(options, &loader, &AnyHub, &MemoryCredentialStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiarizationError::Model(ModelError::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_local_config_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader {
            usable: true,
            requests: Mutex::new(Vec::new()),
        };
        let options = LoadOptions {
            source: ModelSource::Local(dir.path().join("config.yaml")),
            cache_dir: Some(dir.path().to_path_buf()),
            ..LoadOptions::default()
        };

        let err = DiarizationService::load(options, &loader, &AnyHub, &MemoryCredentialStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiarizationError::Model(ModelError::ModelNotFound(_))));
        assert!(loader.requests.lock().unwrap().is_empty());
    }
}
