//! Run controller and its supporting types.
//!
//! [`RunController`] is the single entry point for the presentation layer:
//! it accepts commands (configure, start, advance, approve, submit, reset),
//! consumes progress ticks, and exposes read-only snapshots.

mod config;
mod controller;
mod inputs;
mod provider;
mod snapshot;
mod state;

#[cfg(test)]
mod integration_tests;

pub use config::{ControllerConfig, RunConfiguration};
pub use controller::{RunController, TickOutcome};
pub use inputs::{DocumentCategory, InputCounts, InputReference, RunInputs};
pub use provider::{
    FnOutputProvider, StageOutputProvider, StaticOutputProvider, UnderwritingOutputProvider,
};
pub use snapshot::{RunSnapshot, StageSnapshot};
pub use state::RunState;

#[cfg(test)]
pub use provider::MockStageOutputProvider;
