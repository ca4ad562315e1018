//! Run and controller configuration.

use crate::errors::GateflowError;
use crate::progress::DEFAULT_PROGRESS_INCREMENT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Setup-screen fields that must be present before a run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Loan product type (e.g. "jumbo-mortgage").
    #[serde(default)]
    pub product_type: String,
    /// Selected income categories (e.g. "w2", "self-employed").
    #[serde(default)]
    pub categories: Vec<String>,
}

impl RunConfiguration {
    /// Creates a configuration. Repeated categories are kept once.
    #[must_use]
    pub fn new(
        product_type: impl Into<String>,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let base = Self {
            product_type: product_type.into(),
            categories: Vec::new(),
        };
        categories
            .into_iter()
            .fold(base, |config, category| config.with_category(category))
    }

    /// Adds a category if it is not already selected.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    /// Returns the names of missing required fields.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.product_type.trim().is_empty() {
            missing.push("product_type".to_string());
        }
        if !self.categories.iter().any(|c| !c.trim().is_empty()) {
            missing.push("categories".to_string());
        }
        missing
    }

    /// Validates that a run can start.
    ///
    /// # Errors
    ///
    /// `ConfigurationIncomplete` listing the missing fields.
    pub fn validate(&self) -> Result<(), GateflowError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GateflowError::configuration_incomplete(missing))
        }
    }
}

/// Behaviour of the run controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Activate the next stage as soon as the previous one completes.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
    /// Percentage added per progress tick (1..=100).
    #[serde(default = "default_progress_increment")]
    pub progress_increment: u8,
}

fn default_auto_advance() -> bool {
    true
}

fn default_progress_increment() -> u8 {
    DEFAULT_PROGRESS_INCREMENT
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auto_advance: default_auto_advance(),
            progress_increment: default_progress_increment(),
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets automatic advancement.
    #[must_use]
    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    /// Sets the per-tick increment.
    #[must_use]
    pub fn with_progress_increment(mut self, increment: u8) -> Self {
        self.progress_increment = increment;
        self
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the increment is outside 1..=100.
    pub fn validate(&self) -> Result<(), GateflowError> {
        if !(1..=100).contains(&self.progress_increment) {
            return Err(GateflowError::InvalidConfig(format!(
                "progress_increment must be between 1 and 100, got {}",
                self.progress_increment
            )));
        }
        Ok(())
    }

    /// Parses and validates a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, GateflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GateflowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
