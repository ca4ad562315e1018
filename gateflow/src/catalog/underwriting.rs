//! Built-in loan-underwriting catalog.

use super::{StageCatalog, StageDefinition};
use std::time::Duration;

impl StageCatalog {
    /// The four-stage underwriting analysis: financial statement, credit,
    /// mortgage calculations and policy matching. Only the mortgage
    /// calculations need checker sign-off.
    #[must_use]
    pub fn underwriting() -> Self {
        Self::from_validated(vec![
            StageDefinition::new("pfs-analysis", "Personal Financial Statement Analysis")
                .with_description("Extracting key financial data from client documents")
                .with_duration(Duration::from_millis(3000))
                .with_subtasks([
                    "Reading uploaded PFS document",
                    "Extracting net worth calculations",
                    "Identifying liquid assets",
                    "Calculating debt obligations",
                ]),
            StageDefinition::new("credit-analysis", "Credit Report Analysis")
                .with_description("Analyzing credit history and scoring")
                .with_duration(Duration::from_millis(2500))
                .with_subtasks([
                    "Processing credit report data",
                    "Extracting credit score",
                    "Analyzing payment history",
                    "Calculating monthly obligations",
                ]),
            StageDefinition::new("mortgage-calc", "Mortgage Calculations")
                .with_description("Computing DTI, LTV, and affordability metrics")
                .with_duration(Duration::from_millis(2000))
                .with_subtasks([
                    "Calculating debt-to-income ratio",
                    "Computing loan-to-value ratio",
                    "Analyzing cash flow requirements",
                    "Validating affordability metrics",
                ])
                .requiring_review(),
            StageDefinition::new("policy-check", "Policy & Procedure Matching")
                .with_description("Checking compliance with underwriting guidelines")
                .with_duration(Duration::from_millis(1500))
                .with_subtasks([
                    "Matching against policy requirements",
                    "Validating minimum criteria",
                    "Checking exception rules",
                    "Generating compliance report",
                ]),
        ])
    }
}
