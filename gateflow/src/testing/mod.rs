//! Testing utilities for gateflow runs.
//!
//! This module provides:
//! - Small catalogs and controllers wired to a collecting sink
//! - Assertions over run snapshots and emitted events

mod assertions;
mod fixtures;

pub use assertions::{
    assert_aggregate_progress, assert_event_sequence, assert_ordered_activation,
    assert_phase, assert_single_active, assert_stage_status,
};
pub use fixtures::{
    drive_until_idle, scenario_catalog, single_stage_catalog, TestHarness,
};
