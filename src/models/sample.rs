//! Memory samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source/target pair seen by a subnet.
///
/// Serialized with the short keys `src` / `tgt` used by memory files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    /// Source language text.
    #[serde(rename = "src")]
    pub source: String,
    /// Target language text.
    #[serde(rename = "tgt")]
    pub target: String,
    /// Optional disambiguation context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl MemorySample {
    /// Creates a sample without context.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            context: None,
        }
    }

    /// Attaches a context string.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A sample as held by a [`MemoryLog`](crate::MemoryLog), stamped at insertion.
///
/// Never handed out by the log's read API; timestamps stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSample {
    /// The sample payload.
    #[serde(flatten)]
    pub sample: MemorySample,
    /// Insertion time (UTC).
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_uses_short_keys() {
        let json = serde_json::to_value(MemorySample::new("心梗", "myocardial infarction"))
            .unwrap();
        assert_eq!(json["src"], "心梗");
        assert_eq!(json["tgt"], "myocardial infarction");
        assert!(json.get("context").is_none());
    }

    #[test]
    fn test_stored_sample_flattens() {
        let raw = r#"{"src":"a","tgt":"b","context":"c","timestamp":"2024-01-01T00:00:00Z"}"#;
        let stored: StoredSample = serde_json::from_str(raw).unwrap();
        assert_eq!(stored.sample, MemorySample::new("a", "b").with_context("c"));
    }
}
