//! Document intake references.
//!
//! The engine never reads documents; it only counts the finalized,
//! categorized references handed over by the intake component.

use super::RunConfiguration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned to an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Personal financial statement.
    Pfs,
    /// Credit report.
    Credit,
    /// Asset statement.
    Asset,
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pfs => write!(f, "pfs"),
            Self::Credit => write!(f, "credit"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// Reference to one categorized input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReference {
    /// Document name as provided by intake.
    pub name: String,
    /// Assigned category.
    pub category: DocumentCategory,
}

impl InputReference {
    /// Creates an input reference.
    #[must_use]
    pub fn new(name: impl Into<String>, category: DocumentCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

/// Number of inputs per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCounts {
    /// Personal financial statements.
    pub pfs: usize,
    /// Credit reports.
    pub credit: usize,
    /// Asset statements.
    pub asset: usize,
}

impl InputCounts {
    /// Counts a slice of references.
    #[must_use]
    pub fn from_references(references: &[InputReference]) -> Self {
        references.iter().fold(Self::default(), |mut counts, r| {
            match r.category {
                DocumentCategory::Pfs => counts.pfs += 1,
                DocumentCategory::Credit => counts.credit += 1,
                DocumentCategory::Asset => counts.asset += 1,
            }
            counts
        })
    }

    /// Total number of inputs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pfs + self.credit + self.asset
    }
}

/// Everything a stage-output provider may look at for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    /// Setup configuration the run was started with.
    pub configuration: RunConfiguration,
    /// Categorized document references.
    pub documents: Vec<InputReference>,
}

impl RunInputs {
    /// Returns per-category document counts.
    #[must_use]
    pub fn counts(&self) -> InputCounts {
        InputCounts::from_references(&self.documents)
    }
}
