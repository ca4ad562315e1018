//! Stage output produced when a stage completes.

use super::Confidence;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The output attached to a stage when it transitions to `Completed`.
///
/// The payload is opaque to the engine; only `confidence` and
/// `requires_review` influence the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Confidence of the computed result.
    pub confidence: Confidence,

    /// Whether the provider asks for checker review of this output.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_review: bool,

    /// Opaque result data.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payload: HashMap<String, serde_json::Value>,
}

impl StageOutput {
    /// Creates an output with the given confidence and no payload.
    #[must_use]
    pub fn new(confidence: Confidence) -> Self {
        Self {
            confidence,
            requires_review: false,
            payload: HashMap::new(),
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: HashMap<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Adds a single payload entry.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Flags the output as requiring checker review.
    #[must_use]
    pub fn requiring_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    /// Gets a payload value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}
