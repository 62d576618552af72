//! 說話者分段報告匯出

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::types::DiarizationOutput;

/// 匯出錯誤
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 說話者分段結果的輸出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// 含統計資訊的 JSON 報告
    Json,
    /// NIST RTTM 格式
    Rttm,
    /// Audacity 標籤軌
    Audacity,
}

/// 說話者分段報告匯出器
pub struct Exporter;

impl Exporter {
    /// 以 `format` 輸出 `output`；`uri` 為 RTTM 與 JSON 中的錄音名稱
    pub fn render(
        output: &DiarizationOutput,
        uri: &str,
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        Ok(match format {
            ExportFormat::Json => serde_json::to_string_pretty(&JsonReport::new(output, uri))?,
            ExportFormat::Rttm => Self::format_rttm(output, uri),
            ExportFormat::Audacity => Self::format_audacity(output),
        })
    }

    /// 以 `format` 將 `output` 寫入 `output_path`
    pub fn write<P: AsRef<Path>>(
        output: &DiarizationOutput,
        uri: &str,
        format: ExportFormat,
        output_path: P,
    ) -> Result<(), ExportError> {
        let output_path = output_path.as_ref();

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(output_path, Self::render(output, uri, format)?)?;
        Ok(())
    }

    fn format_rttm(output: &DiarizationOutput, uri: &str) -> String {
        // RTTM fields are whitespace separated
        let uri = uri.replace(char::is_whitespace, "_");

        output
            .iter()
            .map(|(speaker, interval)| {
                format!(
                    "SPEAKER {} 1 {:.3} {:.3} <NA> <NA> {} <NA> <NA>",
                    uri,
                    interval.start,
                    interval.duration(),
                    speaker
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_audacity(output: &DiarizationOutput) -> String {
        output
            .iter()
            .map(|(speaker, interval)| {
                format!(
                    "{:.6}\t{:.6}\t{}",
                    interval.start,
                    interval.end,
                    speaker.replace(['\t', '\n'], " ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    generated_at: String,
    uri: &'a str,
    #[serde(flatten)]
    output: &'a DiarizationOutput,
    statistics: Statistics,
}

#[derive(Serialize)]
struct Statistics {
    segment_count: usize,
    speaker_count: usize,
    duration: f64,
    speaking_time: BTreeMap<String, f64>,
}

impl<'a> JsonReport<'a> {
    fn new(output: &'a DiarizationOutput, uri: &'a str) -> Self {
        let speakers = output.unique_speakers();
        let speaking_time = speakers
            .iter()
            .map(|s| (s.to_string(), output.speaking_time(s)))
            .collect();

        Self {
            version: "1.0",
            generated_at: Local::now().to_rfc3339(),
            uri,
            output,
            statistics: Statistics {
                segment_count: output.len(),
                speaker_count: speakers.len(),
                duration: output.duration(),
                speaking_time,
            },
        }
    }
}
