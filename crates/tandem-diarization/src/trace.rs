//! Raw diarization trace as produced by a pipeline

use serde::{Deserialize, Serialize};
use tandem_core::TimeInterval;

/// One speaker-labelled interval emitted by a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub interval: TimeInterval,
    /// Pipeline-specific track identifier
    pub track: String,
    pub speaker: String,
}

impl TraceEntry {
    pub fn new(start: f64, end: f64, track: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            interval: TimeInterval::new(start, end),
            track: track.into(),
            speaker: speaker.into(),
        }
    }
}

/// Chronologically ordered frame-level trace
///
/// Consecutive entries frequently share a speaker; see
/// [`normalize_trace`](crate::normalize_trace).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTrace {
    entries: Vec<TraceEntry>,
}

impl RawTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, start: f64, end: f64, track: impl Into<String>, speaker: impl Into<String>) {
        self.entries.push(TraceEntry::new(start, end, track, speaker));
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.entries.iter()
    }
}

impl From<Vec<TraceEntry>> for RawTrace {
    fn from(entries: Vec<TraceEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<TraceEntry> for RawTrace {
    fn from_iter<I: IntoIterator<Item = TraceEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RawTrace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
