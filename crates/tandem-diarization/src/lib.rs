//! Speaker diarization for tandem
//!
//! A [`DiarizationService`] owns one loaded [`DiarizationPipeline`], filters the
//! caller's parameters down to what the pipeline declares, runs it and collapses
//! the frame-level trace into speaker turns with [`normalize_trace`].

pub mod error;
pub mod merger;
pub mod normalizer;
pub mod params;
pub mod pipeline;
#[cfg(feature = "pyannote")]
pub mod pyannote;
pub mod service;
pub mod trace;

pub use error::DiarizationError;
pub use merger::{assign_speakers, merge_consecutive_speaker_segments};
pub use normalizer::normalize_trace;
pub use params::DiarizationParams;
pub use pipeline::{DiarizationPipeline, LoadRequest, PipelineLoader};
#[cfg(feature = "pyannote")]
pub use pyannote::{PyannoteLoader, PyannotePipeline};
pub use service::{DiarizationService, LoadOptions};
pub use trace::{RawTrace, TraceEntry};

// Re-export types from tandem-core
pub use tandem_core::{DiarizationOutput, Segment, TranscriptResult};
