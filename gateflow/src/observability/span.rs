//! Span attributes attached to a run.

use crate::run::RunState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::Span;
use uuid::Uuid;

/// Attributes identifying one run in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Run id.
    pub run_id: Uuid,
    /// Run generation.
    pub generation: u64,
    /// Loan product type.
    pub product_type: String,
    /// Number of stages in the catalog.
    pub stage_count: usize,
    /// Number of intake documents.
    pub document_count: usize,
}

impl RunSpanAttributes {
    /// Collects attributes from a live run.
    #[must_use]
    pub fn from_run(run: &RunState) -> Self {
        Self {
            run_id: run.run_id(),
            generation: run.generation(),
            product_type: run.inputs().configuration.product_type.clone(),
            stage_count: run.sequencer().states().len(),
            document_count: run.inputs().documents.len(),
        }
    }

    /// Creates an `info` span carrying these attributes.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            generation = self.generation,
            product_type = %self.product_type,
            stages = self.stage_count,
        )
    }

    /// Flattens the attributes into dotted keys.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("run.id".to_string(), self.run_id.to_string());
        attrs.insert("run.generation".to_string(), self.generation.to_string());
        attrs.insert("run.product_type".to_string(), self.product_type.clone());
        attrs.insert("run.stage_count".to_string(), self.stage_count.to_string());
        attrs.insert("run.document_count".to_string(), self.document_count.to_string());
        attrs
    }
}
