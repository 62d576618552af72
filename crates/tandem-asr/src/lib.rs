//! Speech recognition for tandem
//!
//! [`Transcriber`]s take the same 16 kHz mono waveform the diarization side
//! consumes. The Whisper implementation is behind the `whisper` feature.

pub mod error;
pub mod languages;
pub mod provider;

pub use error::AsrError;
pub use languages::{Language, SUPPORTED_LANGUAGES};
#[cfg(feature = "whisper")]
pub use provider::WhisperTranscriber;
pub use provider::{clean_whisper_text, ensure_asr_input, Transcriber, TranscriptionOptions};

// Re-export types from tandem-core
pub use tandem_core::{Segment, TranscriptResult, WordSegment};
