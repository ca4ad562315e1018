//! Progress simulation for the active stage.
//!
//! This module provides:
//! - `ProgressSimulator` turning ticks into completion percentages
//! - `TickSource` with manual and tokio-interval implementations

mod simulator;
mod ticks;

pub use simulator::{current_subtask, ProgressSimulator, SimulatorStep, DEFAULT_PROGRESS_INCREMENT};
pub use ticks::{IntervalTickSource, ManualTickSource, Tick, TickSchedule, TickSource};
