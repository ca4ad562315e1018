//! Error types for the gateflow engine.
//!
//! Every command on the run controller returns a [`GateflowError`] when it is
//! rejected. A rejected command never mutates run state.

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for gateflow operations.
#[derive(Debug, Error)]
pub enum GateflowError {
    /// Required setup fields are missing before a run can start.
    #[error("Configuration incomplete: missing {}", missing.join(", "))]
    ConfigurationIncomplete {
        /// Names of the missing fields.
        missing: Vec<String>,
    },

    /// A command was issued out of sequence.
    #[error("Invalid transition: cannot {action} ({reason})")]
    InvalidTransition {
        /// The rejected action (e.g. "advance", "submit").
        action: String,
        /// Why the action is not allowed right now.
        reason: String,
    },

    /// A review action targeted a stage with no review record.
    #[error("Unknown stage: '{stage}' has no review record")]
    UnknownStage {
        /// The stage id that was referenced.
        stage: String,
    },

    /// Submission was attempted before every gated stage was approved.
    #[error("Review incomplete: awaiting approval for {}", pending.join(", "))]
    ReviewIncomplete {
        /// Stage ids still awaiting approval.
        pending: Vec<String>,
    },

    /// The run was already submitted.
    #[error("Run has already been submitted")]
    AlreadySubmitted,

    /// The stage catalog failed validation.
    #[error("{0}")]
    CatalogValidation(#[from] CatalogValidationError),

    /// A controller configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateflowError {
    /// Creates a configuration incomplete error.
    #[must_use]
    pub fn configuration_incomplete(missing: Vec<String>) -> Self {
        Self::ConfigurationIncomplete { missing }
    }

    /// Creates an invalid transition error.
    #[must_use]
    pub fn invalid_transition(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown stage error.
    #[must_use]
    pub fn unknown_stage(stage: impl Into<String>) -> Self {
        Self::UnknownStage {
            stage: stage.into(),
        }
    }

    /// Creates a review incomplete error.
    #[must_use]
    pub fn review_incomplete(pending: Vec<String>) -> Self {
        Self::ReviewIncomplete { pending }
    }

    /// Returns a stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationIncomplete { .. } => "ConfigurationIncomplete",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::UnknownStage { .. } => "UnknownStage",
            Self::ReviewIncomplete { .. } => "ReviewIncomplete",
            Self::AlreadySubmitted => "AlreadySubmitted",
            Self::CatalogValidation(_) => "CatalogValidation",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Serialization(_) => "Serialization",
            Self::Io(_) => "Io",
        }
    }

    /// Returns true if the user can fix the condition and retry.
    ///
    /// `UnknownStage` is an integration error and is not recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationIncomplete { .. }
                | Self::InvalidTransition { .. }
                | Self::ReviewIncomplete { .. }
                | Self::AlreadySubmitted
        )
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), json!(self.code()));
        map.insert("message".to_string(), json!(self.to_string()));
        map.insert("recoverable".to_string(), json!(self.is_recoverable()));

        match self {
            Self::ConfigurationIncomplete { missing } => {
                map.insert("missing".to_string(), json!(missing));
            }
            Self::InvalidTransition { action, reason } => {
                map.insert("action".to_string(), json!(action));
                map.insert("reason".to_string(), json!(reason));
            }
            Self::UnknownStage { stage } => {
                map.insert("stage".to_string(), json!(stage));
            }
            Self::ReviewIncomplete { pending } => {
                map.insert("pending".to_string(), json!(pending));
            }
            Self::CatalogValidation(err) => {
                map.insert("stages".to_string(), json!(err.stages));
            }
            _ => {}
        }

        map
    }
}

/// Error raised when a stage catalog fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CatalogValidationError {
    /// The error message.
    pub message: String,
    /// The stage ids involved in the error.
    pub stages: Vec<String>,
}

impl CatalogValidationError {
    /// Creates a new catalog validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}
