//! Core domain model types for gateflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage status, run phase and confidence enums
//! - Strongly typed stage ids
//! - Stage output and run events

mod event;
mod id;
mod output;
mod status;

pub use event::RunEvent;
pub use id::StageId;
pub use output::StageOutput;
pub use status::{Confidence, RunPhase, StageStatus};
