//! Stage output providers.
//!
//! The engine treats the domain calculations as an opaque function from a
//! stage and the run inputs to a [`StageOutput`].

use super::RunInputs;
use crate::catalog::StageDefinition;
use crate::core::{Confidence, StageId, StageOutput};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;

/// Computes the output of a stage when its progress reaches 100%.
#[cfg_attr(test, mockall::automock)]
pub trait StageOutputProvider: Send {
    /// Returns the output for `stage`.
    fn compute_stage_output(&self, stage: &StageDefinition, inputs: &RunInputs) -> StageOutput;
}

/// A provider backed by a closure.
pub struct FnOutputProvider<F>
where
    F: Fn(&StageDefinition, &RunInputs) -> StageOutput + Send,
{
    func: F,
}

impl<F> FnOutputProvider<F>
where
    F: Fn(&StageDefinition, &RunInputs) -> StageOutput + Send,
{
    /// Wraps a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnOutputProvider<F>
where
    F: Fn(&StageDefinition, &RunInputs) -> StageOutput + Send,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOutputProvider").finish_non_exhaustive()
    }
}

impl<F> StageOutputProvider for FnOutputProvider<F>
where
    F: Fn(&StageDefinition, &RunInputs) -> StageOutput + Send,
{
    fn compute_stage_output(&self, stage: &StageDefinition, inputs: &RunInputs) -> StageOutput {
        (self.func)(stage, inputs)
    }
}

/// Returns fixed outputs per stage, with a fallback for unknown stages.
#[derive(Debug, Clone, Default)]
pub struct StaticOutputProvider {
    fallback: StageOutput,
    outputs: HashMap<StageId, StageOutput>,
}

impl StaticOutputProvider {
    /// Creates a provider returning `fallback` for every stage.
    #[must_use]
    pub fn new(fallback: StageOutput) -> Self {
        Self {
            fallback,
            outputs: HashMap::new(),
        }
    }

    /// Sets the output for one stage.
    #[must_use]
    pub fn with_output(mut self, stage: impl Into<StageId>, output: StageOutput) -> Self {
        self.outputs.insert(stage.into(), output);
        self
    }
}

impl StageOutputProvider for StaticOutputProvider {
    fn compute_stage_output(&self, stage: &StageDefinition, _inputs: &RunInputs) -> StageOutput {
        self.outputs
            .get(&stage.id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Canned underwriting results for the built-in catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderwritingOutputProvider;

impl StageOutputProvider for UnderwritingOutputProvider {
    fn compute_stage_output(&self, stage: &StageDefinition, inputs: &RunInputs) -> StageOutput {
        let documents = json!(inputs.documents.len());
        match stage.id.as_str() {
            "pfs-analysis" => StageOutput::new(Confidence::High)
                .with_value("netWorth", json!("$1,247,000"))
                .with_value("liquidAssets", json!("$850,000"))
                .with_value("monthlyIncome", json!("$18,500"))
                .with_value("documentsReviewed", documents),
            "credit-analysis" => StageOutput::new(Confidence::High)
                .with_value("creditScore", json!("726"))
                .with_value("monthlyObligations", json!("$3,200"))
                .with_value("paymentHistory", json!("100% on-time")),
            "mortgage-calc" => StageOutput::new(Confidence::Medium)
                .with_value("dti", json!("28.5%"))
                .with_value("ltv", json!("75%"))
                .with_value("cashReserves", json!("6.2 months"))
                .requiring_review(),
            "policy-check" => StageOutput::new(Confidence::High)
                .with_value("policyMatched", json!("Policy #12A"))
                .with_value("status", json!("Compliant"))
                .with_value("exceptions", json!("None")),
            _ => StageOutput::new(Confidence::Low).requiring_review(),
        }
    }
}
