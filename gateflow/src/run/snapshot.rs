//! Read-only run snapshots for the presentation layer.

use super::{InputCounts, RunConfiguration};
use crate::catalog::StageDefinition;
use crate::core::{RunPhase, StageId, StageOutput, StageStatus};
use crate::review::{ReviewRecord, ReviewSummary};
use crate::sequencer::StageRuntimeState;
use crate::utils::elapsed_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// View of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Stage id.
    pub id: StageId,
    /// Ordinal position.
    pub ordinal: usize,
    /// Title.
    pub title: String,
    /// Runtime status.
    pub status: StageStatus,
    /// Completion percentage.
    pub completion_percent: u8,
    /// Current sub-task index.
    pub current_subtask_index: usize,
    /// Current sub-task label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_subtask: Option<String>,
    /// Whether the catalog requires review for this stage.
    pub requires_review: bool,
    /// Output once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StageOutput>,
    /// Processing time once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl StageSnapshot {
    pub(crate) fn pending(definition: &StageDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            ordinal: definition.ordinal,
            title: definition.title.clone(),
            status: StageStatus::Pending,
            completion_percent: 0,
            current_subtask_index: 0,
            current_subtask: None,
            requires_review: definition.requires_review,
            output: None,
            elapsed_ms: None,
        }
    }

    pub(crate) fn from_state(definition: &StageDefinition, state: &StageRuntimeState) -> Self {
        let current_subtask = state
            .is_active()
            .then(|| definition.subtask(state.current_subtask_index))
            .flatten()
            .map(ToString::to_string);
        let elapsed = match (&state.started_at, &state.completed_at) {
            (Some(start), Some(end)) => Some(elapsed_ms(start, end)),
            _ => None,
        };

        Self {
            status: state.status,
            completion_percent: state.completion_percent,
            current_subtask_index: state.current_subtask_index,
            current_subtask,
            output: state.output.clone(),
            elapsed_ms: elapsed,
            ..Self::pending(definition)
        }
    }
}

/// Complete, serializable view of the controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Current run id; `None` in setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Lifecycle phase.
    pub phase: RunPhase,
    /// Setup configuration.
    pub configuration: RunConfiguration,
    /// Intake document counts.
    pub inputs: InputCounts,
    /// Overall progress in percent.
    pub aggregate_progress: f64,
    /// Ordinal of the active stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_stage: Option<usize>,
    /// Per-stage views in order.
    pub stages: Vec<StageSnapshot>,
    /// Review records in stage order.
    pub reviews: Vec<ReviewRecord>,
    /// Review progress.
    pub review_summary: ReviewSummary,
    /// Run-level reviewer note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_comment: Option<String>,
    /// Whether every gated stage is approved.
    pub ready_for_submission: bool,
}

impl RunSnapshot {
    /// Returns the view of a stage.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Returns the review record of a stage.
    #[must_use]
    pub fn review(&self, id: &str) -> Option<&ReviewRecord> {
        self.reviews.iter().find(|r| r.stage == id)
    }

    /// Returns the number of active stages.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.status == StageStatus::Active)
            .count()
    }
}
