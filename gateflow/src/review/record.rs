//! Review records and summaries.

use crate::core::{Confidence, StageId};
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// Checker decision for one review-gated stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// The reviewed stage.
    pub stage: StageId,
    /// Ordinal of the stage.
    pub ordinal: usize,
    /// Stage title, for display.
    pub title: String,
    /// Confidence of the stage output under review.
    pub confidence: Confidence,
    /// Current approval.
    pub approved: bool,
    /// Reviewer note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Set once an approval is reversed; never cleared.
    pub overridden: bool,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl ReviewRecord {
    /// Creates an unapproved record.
    #[must_use]
    pub fn new(stage: StageId, ordinal: usize, title: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            stage,
            ordinal,
            title: title.into(),
            confidence,
            approved: false,
            comment: None,
            overridden: false,
            updated_at: now_utc(),
        }
    }

    /// Applies a decision. Reversing an approval marks the record overridden.
    pub fn decide(&mut self, approved: bool) {
        if self.approved && !approved {
            self.overridden = true;
        }
        self.approved = approved;
        self.updated_at = now_utc();
    }

    /// Replaces the reviewer note. Blank notes clear it.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        let comment = comment.into();
        self.comment = if comment.trim().is_empty() {
            None
        } else {
            Some(comment)
        };
        self.updated_at = now_utc();
    }
}

/// Review progress across the whole run ("3/4 Steps Reviewed").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Completed stages that are approved or auto-approved.
    pub reviewed: usize,
    /// Stages in the catalog.
    pub total: usize,
    /// Review-gated stages still awaiting approval.
    pub pending: Vec<StageId>,
    /// Stages whose approval was reversed at some point.
    pub overridden: Vec<StageId>,
}

impl ReviewSummary {
    /// Returns true when every stage in the catalog is reviewed.
    #[must_use]
    pub fn is_fully_reviewed(&self) -> bool {
        self.reviewed == self.total
    }
}
