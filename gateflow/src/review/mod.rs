//! Checker review gate.
//!
//! Every completed stage either needs an explicit checker approval or is
//! auto-approved. The run can only be submitted once every review record is
//! approved.

mod record;

pub use record::{ReviewRecord, ReviewSummary};

use crate::catalog::StageDefinition;
use crate::core::{StageId, StageOutput};
use crate::errors::GateflowError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Change notification produced by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewChange {
    /// The affected stage.
    pub stage: StageId,
    /// Current approval.
    pub approved: bool,
    /// Whether the approval was ever reversed.
    pub overridden: bool,
    /// Readiness of the whole run after the change.
    pub ready_for_submission: bool,
}

/// Tracks review records and the submission decision for one run.
#[derive(Debug, Clone, Default)]
pub struct ReviewGate {
    total_stages: usize,
    records: Vec<ReviewRecord>,
    auto_approved: Vec<StageId>,
    overall_comment: Option<String>,
    submitted: bool,
}

impl ReviewGate {
    /// Creates a gate for a run over `total_stages` stages.
    #[must_use]
    pub fn new(total_stages: usize) -> Self {
        Self {
            total_stages,
            ..Self::default()
        }
    }

    /// Registers a stage that just completed.
    ///
    /// Creates an unapproved record when the definition or the output asks
    /// for review; otherwise the stage is auto-approved. Returns the change
    /// when a record was created.
    pub fn register_completed_stage(
        &mut self,
        definition: &StageDefinition,
        output: &StageOutput,
    ) -> Option<ReviewChange> {
        if self.is_registered(definition.id.as_str()) {
            debug!(stage = %definition.id, "stage already registered with review gate");
            return None;
        }

        if !(definition.requires_review || output.requires_review) {
            debug!(stage = %definition.id, "stage auto-approved");
            self.auto_approved.push(definition.id.clone());
            return None;
        }

        let record = ReviewRecord::new(
            definition.id.clone(),
            definition.ordinal,
            definition.title.clone(),
            output.confidence,
        );
        info!(stage = %record.stage, confidence = %record.confidence, "stage awaiting review");
        self.records.push(record);

        Some(ReviewChange {
            stage: definition.id.clone(),
            approved: false,
            overridden: false,
            ready_for_submission: false,
        })
    }

    /// Records a checker decision for a gated stage.
    ///
    /// Turning an approval off marks the record overridden for good. A
    /// `comment` replaces the existing note; `None` keeps it.
    ///
    /// # Errors
    ///
    /// `UnknownStage` when the stage has no review record, `InvalidTransition`
    /// after submission.
    pub fn set_approval(
        &mut self,
        stage: &str,
        approved: bool,
        comment: Option<String>,
    ) -> Result<ReviewChange, GateflowError> {
        self.ensure_open("set approval")?;
        let record = self.record_mut(stage)?;

        let was_overridden = record.overridden;
        record.decide(approved);
        if let Some(comment) = comment {
            record.set_comment(comment);
        }
        if record.overridden && !was_overridden {
            warn!(stage = %record.stage, "approval overridden by checker");
        } else {
            info!(stage = %record.stage, approved, "review decision recorded");
        }

        Ok(self.change_for(stage))
    }

    /// Attaches a reviewer note without changing the decision.
    ///
    /// # Errors
    ///
    /// `UnknownStage` when the stage has no review record, `InvalidTransition`
    /// after submission.
    pub fn set_comment(
        &mut self,
        stage: &str,
        comment: impl Into<String>,
    ) -> Result<ReviewChange, GateflowError> {
        self.ensure_open("comment")?;
        self.record_mut(stage)?.set_comment(comment);
        Ok(self.change_for(stage))
    }

    /// Sets the run-level reviewer note. Blank notes clear it.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` after submission.
    pub fn set_overall_comment(&mut self, comment: impl Into<String>) -> Result<(), GateflowError> {
        self.ensure_open("comment")?;
        let comment = comment.into();
        self.overall_comment = if comment.trim().is_empty() {
            None
        } else {
            Some(comment)
        };
        Ok(())
    }

    /// True iff every review record is approved.
    #[must_use]
    pub fn is_ready_for_submission(&self) -> bool {
        self.records.iter().all(|r| r.approved)
    }

    /// Marks the run submitted.
    ///
    /// # Errors
    ///
    /// `AlreadySubmitted` on repeat calls, `ReviewIncomplete` while any
    /// record is unapproved. State is unchanged on error.
    pub fn submit(&mut self) -> Result<(), GateflowError> {
        if self.submitted {
            return Err(GateflowError::AlreadySubmitted);
        }
        if !self.is_ready_for_submission() {
            let pending = self.pending().iter().map(ToString::to_string).collect();
            return Err(GateflowError::review_incomplete(pending));
        }

        self.submitted = true;
        info!(records = self.records.len(), "review gate cleared");
        Ok(())
    }

    /// Returns the gated stages still awaiting approval.
    #[must_use]
    pub fn pending(&self) -> Vec<StageId> {
        self.records
            .iter()
            .filter(|r| !r.approved)
            .map(|r| r.stage.clone())
            .collect()
    }

    /// Returns review progress for the run.
    #[must_use]
    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            reviewed: self.auto_approved.len() + self.records.iter().filter(|r| r.approved).count(),
            total: self.total_stages,
            pending: self.pending(),
            overridden: self
                .records
                .iter()
                .filter(|r| r.overridden)
                .map(|r| r.stage.clone())
                .collect(),
        }
    }

    /// Returns the record for a stage.
    #[must_use]
    pub fn record(&self, stage: &str) -> Option<&ReviewRecord> {
        self.records.iter().find(|r| r.stage == stage)
    }

    /// Returns all review records in stage order.
    #[must_use]
    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    /// Returns the stages that were auto-approved.
    #[must_use]
    pub fn auto_approved(&self) -> &[StageId] {
        &self.auto_approved
    }

    /// Returns the run-level reviewer note.
    #[must_use]
    pub fn overall_comment(&self) -> Option<&str> {
        self.overall_comment.as_deref()
    }

    /// Returns true once the gate has been submitted.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn is_registered(&self, stage: &str) -> bool {
        self.record(stage).is_some() || self.auto_approved.iter().any(|s| s == stage)
    }

    fn ensure_open(&self, action: &str) -> Result<(), GateflowError> {
        if self.submitted {
            return Err(GateflowError::invalid_transition(
                action,
                "run already submitted",
            ));
        }
        Ok(())
    }

    fn record_mut(&mut self, stage: &str) -> Result<&mut ReviewRecord, GateflowError> {
        self.records
            .iter_mut()
            .find(|r| r.stage == stage)
            .ok_or_else(|| GateflowError::unknown_stage(stage))
    }

    fn change_for(&self, stage: &str) -> ReviewChange {
        let ready_for_submission = self.is_ready_for_submission();
        self.record(stage).map_or_else(
            || ReviewChange {
                stage: StageId::new(stage),
                approved: false,
                overridden: false,
                ready_for_submission,
            },
            |record| ReviewChange {
                stage: record.stage.clone(),
                approved: record.approved,
                overridden: record.overridden,
                ready_for_submission,
            },
        )
    }
}
