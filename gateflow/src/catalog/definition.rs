//! Stage definitions.

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable description of one stage in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Unique stage key.
    pub id: StageId,
    /// Position in the catalog, assigned when the catalog is built.
    #[serde(default, skip_deserializing)]
    pub ordinal: usize,
    /// Human-readable title.
    pub title: String,
    /// Short description shown alongside the title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Ordered sub-task labels shown while the stage is active.
    pub subtasks: Vec<String>,
    /// Nominal duration in milliseconds. Advisory pacing only.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// Whether the stage output needs checker sign-off.
    #[serde(default)]
    pub requires_review: bool,
}

fn default_duration_ms() -> u64 {
    2000
}

impl StageDefinition {
    /// Creates a stage definition with no sub-tasks.
    #[must_use]
    pub fn new(id: impl Into<StageId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ordinal: 0,
            title: title.into(),
            description: String::new(),
            subtasks: Vec::new(),
            duration_ms: default_duration_ms(),
            requires_review: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the sub-task labels.
    #[must_use]
    pub fn with_subtasks(mut self, subtasks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.subtasks = subtasks.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a sub-task label.
    #[must_use]
    pub fn with_subtask(mut self, subtask: impl Into<String>) -> Self {
        self.subtasks.push(subtask.into());
        self
    }

    /// Sets the nominal duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Marks the stage as requiring checker review.
    #[must_use]
    pub fn requiring_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    /// Returns the nominal duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Returns the number of sub-tasks.
    #[must_use]
    pub fn subtask_count(&self) -> usize {
        self.subtasks.len()
    }

    /// Returns the sub-task label at `index`.
    #[must_use]
    pub fn subtask(&self, index: usize) -> Option<&str> {
        self.subtasks.get(index).map(String::as_str)
    }
}
