//! Speech-to-text providers

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tandem_core::{TranscriptResult, Waveform, DEFAULT_SAMPLE_RATE};

use crate::error::AsrError;

/// Transcription options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionOptions {
    /// Language code (e.g., "en", "zh-TW"); `None` auto-detects
    pub language: Option<String>,
    /// Include word-level timestamps
    pub word_timestamps: bool,
    /// Number of threads (0 = auto)
    pub threads: u32,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            language: None,
            word_timestamps: true,
            threads: 0,
        }
    }
}

/// Turns a 16 kHz mono waveform into text segments
pub trait Transcriber: Send {
    fn transcribe(
        &mut self,
        waveform: &Waveform,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptResult, AsrError>;
}

/// Reject audio at any rate other than 16 kHz
pub fn ensure_asr_input(waveform: &Waveform) -> Result<(), AsrError> {
    if waveform.sample_rate() != DEFAULT_SAMPLE_RATE {
        return Err(AsrError::InvalidAudioFormat(format!(
            "expected {} Hz audio, got {} Hz",
            DEFAULT_SAMPLE_RATE,
            waveform.sample_rate()
        )));
    }
    Ok(())
}

static SPECIAL_TOKEN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<\|[^|]+\|>"));

/// Clean Whisper output text by removing `<|...|>` tokens
pub fn clean_whisper_text(text: &str) -> String {
    match &*SPECIAL_TOKEN {
        Ok(re) => re.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

#[cfg(feature = "whisper")]
pub use whisper::WhisperTranscriber;

#[cfg(feature = "whisper")]
mod whisper {
    use std::path::{Path, PathBuf};

    use tandem_core::{Segment, TranscriptResult, Waveform, WordSegment};
    use tracing::{debug, info};
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::{clean_whisper_text, ensure_asr_input, Transcriber, TranscriptionOptions};
    use crate::error::AsrError;
    use crate::languages::Language;

    fn failed(e: impl std::fmt::Display) -> AsrError {
        AsrError::TranscriptionFailed(e.to_string())
    }

    /// Whisper (GGML) transcriber
    pub struct WhisperTranscriber {
        context: WhisperContext,
        model_path: PathBuf,
    }

    impl WhisperTranscriber {
        /// Load a GGML model file; blocking
        pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, AsrError> {
            let model_path = model_path.as_ref();
            info!("Loading Whisper model from: {}", model_path.display());

            if !model_path.exists() {
                return Err(AsrError::FileNotFound(model_path.display().to_string()));
            }

            let path = model_path
                .to_str()
                .ok_or_else(|| AsrError::ModelLoadFailed(format!("non UTF-8 path: {}", model_path.display())))?;
            let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
                .map_err(|e| AsrError::ModelLoadFailed(e.to_string()))?;

            info!("Whisper model loaded successfully");
            Ok(Self {
                context,
                model_path: model_path.to_path_buf(),
            })
        }

        pub fn model_path(&self) -> &Path {
            &self.model_path
        }
    }

    impl Transcriber for WhisperTranscriber {
        fn transcribe(
            &mut self,
            waveform: &Waveform,
            options: &TranscriptionOptions,
        ) -> Result<TranscriptResult, AsrError> {
            ensure_asr_input(waveform)?;
            let whisper_lang = Language::resolve(options.language.as_deref())?;

            info!("Starting transcription of {:.1}s", waveform.duration());
            debug!("Options: {:?}", options);

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(whisper_lang.unwrap_or("auto")));
            params.set_token_timestamps(options.word_timestamps);
            params.set_print_progress(false);
            params.set_print_realtime(false);

            if options.threads > 0 {
                params.set_n_threads(options.threads as i32);
            }

            let mut state = self.context.create_state().map_err(failed)?;
            state.full(params, waveform.samples()).map_err(failed)?;

            let num_segments = state.full_n_segments().map_err(failed)?;
            let mut segments = Vec::new();

            for i in 0..num_segments {
                let text = state.full_get_segment_text(i).map_err(failed)?;
                let start = state.full_get_segment_t0(i).map_err(failed)? as f64 / 100.0;
                let end = state.full_get_segment_t1(i).map_err(failed)? as f64 / 100.0;

                let mut words = Vec::new();
                if options.word_timestamps {
                    let num_tokens = state.full_n_tokens(i).map_err(failed)?;
                    for j in 0..num_tokens {
                        let token_text = state.full_get_token_text(i, j).map_err(failed)?;
                        if token_text.starts_with('<') && token_text.ends_with('>') {
                            continue;
                        }
                        let token_data = state.full_get_token_data(i, j).map_err(failed)?;

                        words.push(WordSegment {
                            word: token_text.trim().to_string(),
                            start: token_data.t0 as f64 / 100.0,
                            end: token_data.t1 as f64 / 100.0,
                            confidence: token_data.p as f64,
                            speaker: None,
                        });
                    }
                }

                let clean_text = clean_whisper_text(&text);
                if !clean_text.is_empty() {
                    segments.push(Segment {
                        text: clean_text,
                        start,
                        end,
                        speaker: None,
                        words,
                    });
                }
            }

            let language = match whisper_lang {
                Some(code) => code.to_string(),
                None => state
                    .full_lang_id_from_state()
                    .ok()
                    .and_then(whisper_rs::get_lang_str)
                    .unwrap_or("auto")
                    .to_string(),
            };

            info!("Transcription completed: {} segments", segments.len());
            Ok(TranscriptResult {
                segments,
                language,
                duration: waveform.duration(),
            })
        }
    }
}
