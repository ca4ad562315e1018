//! Run events emitted to the presentation layer.

use super::{StageId, StageOutput};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event emitted by the run controller.
///
/// Events are delivered in the order the state changes happen, on the same
/// logical timeline as the commands and ticks that caused them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// A run was created from the current configuration.
    #[serde(rename = "run.started")]
    RunStarted {
        /// The new run id.
        run_id: Uuid,
        /// Number of stages in the catalog.
        stage_count: usize,
        /// Configured product type.
        product_type: String,
    },

    /// A stage became active.
    #[serde(rename = "stage.activated")]
    StageActivated {
        /// The activated stage.
        stage: StageId,
        /// Ordinal position of the stage.
        ordinal: usize,
    },

    /// The active stage made progress.
    #[serde(rename = "stage.progress")]
    StageProgressTick {
        /// The active stage.
        stage: StageId,
        /// Completion percentage.
        percent: u8,
        /// Index of the sub-task being shown.
        subtask_index: usize,
    },

    /// A stage completed with an output.
    #[serde(rename = "stage.completed")]
    StageCompleted {
        /// The completed stage.
        stage: StageId,
        /// The attached output.
        output: StageOutput,
        /// Aggregate run progress after this completion.
        aggregate_progress: f64,
    },

    /// Every stage in the catalog completed.
    #[serde(rename = "run.processing_complete")]
    RunProcessingComplete {
        /// Number of stages processed.
        stages_processed: usize,
    },

    /// A review record was created or changed.
    #[serde(rename = "review.changed")]
    ReviewStateChanged {
        /// The reviewed stage.
        stage: StageId,
        /// Current approval.
        approved: bool,
        /// Whether a prior approval was ever reversed.
        overridden: bool,
        /// Readiness of the run for submission after this change.
        ready_for_submission: bool,
    },

    /// The run was submitted.
    #[serde(rename = "run.submitted")]
    RunSubmitted {
        /// The submitted run id.
        run_id: Uuid,
    },

    /// The run was discarded and the controller returned to setup.
    #[serde(rename = "run.reset")]
    RunReset {
        /// The discarded run id.
        run_id: Uuid,
    },
}

impl RunEvent {
    /// Returns the dotted event type (e.g. "stage.activated").
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StageActivated { .. } => "stage.activated",
            Self::StageProgressTick { .. } => "stage.progress",
            Self::StageCompleted { .. } => "stage.completed",
            Self::RunProcessingComplete { .. } => "run.processing_complete",
            Self::ReviewStateChanged { .. } => "review.changed",
            Self::RunSubmitted { .. } => "run.submitted",
            Self::RunReset { .. } => "run.reset",
        }
    }

    /// Returns the stage this event refers to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&StageId> {
        match self {
            Self::StageActivated { stage, .. }
            | Self::StageProgressTick { stage, .. }
            | Self::StageCompleted { stage, .. }
            | Self::ReviewStateChanged { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Converts the event to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
