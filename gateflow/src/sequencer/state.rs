//! Per-stage runtime state.

use crate::catalog::StageDefinition;
use crate::core::{StageId, StageOutput, StageStatus};
use crate::errors::GateflowError;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// Runtime state of one stage within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRuntimeState {
    /// The stage this state belongs to.
    pub stage: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Completion percentage, 100 iff completed.
    pub completion_percent: u8,
    /// Index of the sub-task being shown.
    pub current_subtask_index: usize,
    /// Number of sub-tasks declared by the stage.
    pub subtask_count: usize,
    /// Output, set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StageOutput>,
    /// When the stage became active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the stage completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl StageRuntimeState {
    /// Creates the pending state for a stage.
    #[must_use]
    pub fn pending(definition: &StageDefinition) -> Self {
        Self {
            stage: definition.id.clone(),
            status: StageStatus::Pending,
            completion_percent: 0,
            current_subtask_index: 0,
            subtask_count: definition.subtask_count(),
            output: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Moves the stage to `next`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when `next` is not a legal successor; the status
    /// is left untouched.
    pub fn transition(&mut self, next: StageStatus) -> Result<(), GateflowError> {
        if !self.status.can_transition_to(next) {
            return Err(GateflowError::invalid_transition(
                format!("move stage '{}' to {next}", self.stage),
                format!("stage is {}", self.status),
            ));
        }
        self.status = next;
        Ok(())
    }

    /// Returns true if the stage is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StageStatus::Active
    }

    /// Returns true if the stage completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }
}
