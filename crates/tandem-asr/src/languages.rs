//! Supported languages for ASR

use serde::Serialize;

use crate::error::AsrError;

/// Language information
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Language {
    /// Language code (e.g., "en", "zh-TW")
    pub code: &'static str,
    /// Display name
    pub name: &'static str,
    /// Whisper language code (may differ from code)
    pub whisper_code: &'static str,
}

const fn lang(code: &'static str, name: &'static str, whisper_code: &'static str) -> Language {
    Language {
        code,
        name,
        whisper_code,
    }
}

/// Supported languages list
pub static SUPPORTED_LANGUAGES: &[Language] = &[
    lang("en", "English", "en"),
    lang("de", "Deutsch", "de"),
    lang("fr", "Français", "fr"),
    lang("es", "Español", "es"),
    lang("it", "Italiano", "it"),
    lang("pt", "Português", "pt"),
    lang("nl", "Nederlands", "nl"),
    lang("pl", "Polski", "pl"),
    lang("ru", "Русский", "ru"),
    lang("uk", "Українська", "uk"),
    lang("tr", "Türkçe", "tr"),
    lang("ar", "العربية", "ar"),
    lang("hi", "हिन्दी", "hi"),
    lang("ja", "日本語", "ja"),
    lang("ko", "한국어", "ko"),
    lang("zh", "简体中文", "zh"),
    lang("zh-TW", "繁體中文", "zh"),
    lang("yue", "粵語", "yue"),
];

impl Language {
    /// Map a user-selected language code to Whisper's language code
    pub fn to_whisper_code(code: &str) -> Option<&'static str> {
        Self::get(code).map(|l| l.whisper_code)
    }

    /// Check if a language is supported
    pub fn is_supported(code: &str) -> bool {
        Self::get(code).is_some()
    }

    /// Get language info by code (case-insensitive)
    pub fn get(code: &str) -> Option<&'static Language> {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
    }

    /// Whisper code for an optional user choice; `None` means auto-detect
    pub fn resolve(code: Option<&str>) -> Result<Option<&'static str>, AsrError> {
        match code {
            None => Ok(None),
            Some(code) if code.eq_ignore_ascii_case("auto") => Ok(None),
            Some(code) => Self::to_whisper_code(code)
                .map(Some)
                .ok_or_else(|| AsrError::UnsupportedLanguage(code.to_string())),
        }
    }
}
