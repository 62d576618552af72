//! Inference parameters passed to a pipeline

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Keyword parameters for a diarization run
///
/// Callers may pass a superset of what a pipeline understands; the service
/// filters against the pipeline's declared names before applying it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiarizationParams(BTreeMap<String, Value>);

impl DiarizationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parse a `key=value` assignment; the value is read as JSON, else kept as a string
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<(), String> {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", assignment))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty parameter name in '{}'", assignment));
        }

        let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn num_speakers(&self) -> Option<u32> {
        self.get_u32("num_speakers")
    }

    pub fn min_speakers(&self) -> Option<u32> {
        self.get_u32("min_speakers")
    }

    pub fn max_speakers(&self) -> Option<u32> {
        self.get_u32("max_speakers")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the keys in `accepted`; anything else is dropped silently
    pub fn filter(&self, accepted: &[&str]) -> DiarizationParams {
        let (kept, dropped): (BTreeMap<_, _>, BTreeMap<_, _>) = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(k, _)| accepted.contains(&k.as_str()));

        if !dropped.is_empty() {
            debug!(
                "Ignoring unsupported parameters: {:?}",
                dropped.keys().collect::<Vec<_>>()
            );
        }

        DiarizationParams(kept)
    }
}

impl FromIterator<(String, Value)> for DiarizationParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_unknown_keys() {
        let params = DiarizationParams::new()
            .with("num_speakers", 2)
            .with("beam_size", 5)
            .with("threshold", 0.5);

        let filtered = params.filter(&["num_speakers", "threshold", "min_speakers"]);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.num_speakers(), Some(2));
        assert_eq!(filtered.get_f64("threshold"), Some(0.5));
        assert!(!filtered.contains("beam_size"));
        // the original is untouched
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_assignment_parsing() {
        let mut params = DiarizationParams::new();
        params.insert_assignment("max_speakers=4").unwrap();
        params.insert_assignment("threshold = 0.7").unwrap();
        params.insert_assignment("label=hello world").unwrap();

        assert_eq!(params.max_speakers(), Some(4));
        assert_eq!(params.get_f64("threshold"), Some(0.7));
        assert_eq!(params.get("label"), Some(&Value::from("hello world")));

        assert!(params.insert_assignment("novalue").is_err());
        assert!(params.insert_assignment("=3").is_err());
    }

    #[test]
    fn test_typed_accessors_reject_wrong_types() {
        let params = DiarizationParams::new()
            .with("num_speakers", "two")
            .with("min_speakers", -1);
        assert_eq!(params.num_speakers(), None);
        assert_eq!(params.min_speakers(), None);
        assert_eq!(params.max_speakers(), None);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let params = DiarizationParams::new().with("num_speakers", 3);
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"num_speakers":3}"#);
    }
}
