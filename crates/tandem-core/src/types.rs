//! 共用類型定義

use serde::{Deserialize, Serialize};

/// 時間區間（秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    /// 開始時間（秒）
    pub start: f64,
    /// 結束時間（秒）
    pub end: f64,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// 計算區間時長（秒）
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// 區間中點
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// `time` 是否落在閉區間內
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// 正規化的說話者分段結果
///
/// `speakers[i]` 為 `segments[i]` 的說話者標識。段落依時間排序，
/// 相鄰兩段不會是同一說話者。序列化格式為
/// `{"speakers": [...], "segments": [[start, end], ...]}`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiarizationOutput {
    /// 每段的說話者標識
    pub speakers: Vec<String>,
    /// `[start, end]` 時間對（秒）
    pub segments: Vec<[f64; 2]>,
}

impl DiarizationOutput {
    /// 新增一段說話者發言
    pub fn push(&mut self, speaker: impl Into<String>, start: f64, end: f64) {
        self.speakers.push(speaker.into());
        self.segments.push([start, end]);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 依序走訪 `(speaker, interval)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, TimeInterval)> + '_ {
        self.speakers
            .iter()
            .zip(self.segments.iter())
            .map(|(speaker, [start, end])| (speaker.as_str(), TimeInterval::new(*start, *end)))
    }

    /// 依首次出現順序列出不重複的說話者
    pub fn unique_speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for speaker in &self.speakers {
            if !seen.contains(&speaker.as_str()) {
                seen.push(speaker);
            }
        }
        seen
    }

    /// `speaker` 的總發言時長（秒）
    pub fn speaking_time(&self, speaker: &str) -> f64 {
        self.iter()
            .filter(|(label, _)| *label == speaker)
            .map(|(_, interval)| interval.duration())
            .sum()
    }

    /// 最後一段的結束時間，無段落時為 0.0
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|[_, end]| *end).unwrap_or(0.0)
    }
}

/// 單詞級別時間戳
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSegment {
    /// 單詞文字
    pub word: String,
    /// 開始時間（秒）
    pub start: f64,
    /// 結束時間（秒）
    pub end: f64,
    /// 信心分數
    pub confidence: f64,
    /// 說話者標識
    pub speaker: Option<String>,
}

/// 句子級別段落
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// 文字內容
    pub text: String,
    /// 開始時間（秒）
    pub start: f64,
    /// 結束時間（秒）
    pub end: f64,
    /// 說話者標識
    pub speaker: Option<String>,
    /// 單詞列表
    pub words: Vec<WordSegment>,
}

/// 轉錄結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// 段落列表
    pub segments: Vec<Segment>,
    /// 語言代碼
    pub language: String,
    /// 音訊時長（秒）
    pub duration: f64,
}

/// 音訊資訊
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    /// 檔案路徑
    pub path: String,
    /// 時長（秒）
    pub duration: f64,
    /// 取樣率
    pub sample_rate: u32,
    /// 聲道數
    pub channels: u16,
    /// 位元深度
    pub bits_per_sample: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> DiarizationOutput {
        let mut output = DiarizationOutput::default();
        output.push("A", 0.0, 2.0);
        output.push("B", 2.0, 3.5);
        output.push("A", 3.5, 4.0);
        output
    }

    #[test]
    fn test_output_serializes_as_pairs() {
        let json = serde_json::to_value(sample_output()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "speakers": ["A", "B", "A"],
                "segments": [[0.0, 2.0], [2.0, 3.5], [3.5, 4.0]]
            })
        );
    }

    #[test]
    fn test_unique_speakers_and_speaking_time() {
        let output = sample_output();
        assert_eq!(output.unique_speakers(), vec!["A", "B"]);
        assert!((output.speaking_time("A") - 2.5).abs() < 1e-9);
        assert!((output.duration() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_interval_contains() {
        let interval = TimeInterval::new(1.0, 2.0);
        assert!(interval.contains(1.0));
        assert!(interval.contains(2.0));
        assert!(!interval.contains(2.01));
        assert!((interval.midpoint() - 1.5).abs() < 1e-9);
    }
}
