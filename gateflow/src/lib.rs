//! # Gateflow
//!
//! A staged workflow engine with a human review gate.
//!
//! Gateflow runs an ordered catalog of processing stages one at a time,
//! simulates their progress from discrete ticks, and holds the run at a
//! checker review gate until every flagged stage is approved:
//!
//! - **Strict sequencing**: at most one active stage, in catalog order
//! - **Pluggable ticks**: deterministic manual ticks or a tokio interval
//! - **Review gate**: per-stage approvals with a one-way override audit flag
//! - **Event-driven presentation**: every state change is emitted as a `RunEvent`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gateflow::prelude::*;
//!
//! # async fn demo() -> Result<(), GateflowError> {
//! let mut controller = RunController::underwriting()
//!     .with_tick_source(IntervalTickSource::new());
//!
//! controller.configure("jumbo-mortgage", ["w2"])?;
//! controller.start()?;
//! controller.run_to_completion().await?;
//!
//! controller.set_approval("mortgage-calc", true, None)?;
//! controller.submit()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod catalog;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod progress;
pub mod review;
pub mod run;
pub mod sequencer;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{StageCatalog, StageDefinition};
    pub use crate::core::{Confidence, RunEvent, RunPhase, StageId, StageOutput, StageStatus};
    pub use crate::errors::{CatalogValidationError, GateflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat, TracingConfig};
    pub use crate::progress::{IntervalTickSource, ManualTickSource, Tick, TickSource};
    pub use crate::review::{ReviewRecord, ReviewSummary};
    pub use crate::run::{
        ControllerConfig, DocumentCategory, InputReference, RunConfiguration, RunController,
        RunSnapshot, StageOutputProvider, TickOutcome, UnderwritingOutputProvider,
    };
    pub use crate::utils::{iso_timestamp, Timestamp};
}
