//! Test assertions for run snapshots and events.

use crate::core::{RunEvent, RunPhase, StageStatus};
use crate::events::CollectingEventSink;
use crate::run::RunSnapshot;

/// Asserts the lifecycle phase.
pub fn assert_phase(snapshot: &RunSnapshot, expected: RunPhase) {
    assert_eq!(
        snapshot.phase, expected,
        "Expected phase {expected}, got {}",
        snapshot.phase
    );
}

/// Asserts the status of one stage.
pub fn assert_stage_status(snapshot: &RunSnapshot, stage: &str, expected: StageStatus) {
    let Some(view) = snapshot.stage(stage) else {
        panic!("Stage '{stage}' is not in the snapshot");
    };
    assert_eq!(
        view.status, expected,
        "Expected stage '{stage}' to be {expected}, got {}",
        view.status
    );
}

/// Asserts that no more than one stage is active.
pub fn assert_single_active(snapshot: &RunSnapshot) {
    let active: Vec<_> = snapshot
        .stages
        .iter()
        .filter(|s| s.status == StageStatus::Active)
        .map(|s| s.id.as_str())
        .collect();
    assert!(active.len() <= 1, "Expected at most one active stage, got {active:?}");
}

/// Asserts that every active or completed stage follows a completed one.
pub fn assert_ordered_activation(snapshot: &RunSnapshot) {
    for pair in snapshot.stages.windows(2) {
        if pair[1].status != StageStatus::Pending {
            assert_eq!(
                pair[0].status,
                StageStatus::Completed,
                "Stage '{}' is {} before '{}' completed",
                pair[1].id,
                pair[1].status,
                pair[0].id
            );
        }
    }
}

/// Asserts the aggregate progress within floating point tolerance.
pub fn assert_aggregate_progress(snapshot: &RunSnapshot, expected: f64) {
    assert!(
        (snapshot.aggregate_progress - expected).abs() < f64::EPSILON,
        "Expected aggregate progress {expected}, got {}",
        snapshot.aggregate_progress
    );
}

/// Asserts the emitted event types, ignoring progress ticks.
pub fn assert_event_sequence(sink: &CollectingEventSink, expected: &[&str]) {
    let actual: Vec<&'static str> = sink
        .events()
        .iter()
        .filter(|e| !matches!(e, RunEvent::StageProgressTick { .. }))
        .map(RunEvent::event_type)
        .collect();
    assert_eq!(actual, expected, "Unexpected event sequence");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scenario_catalog, TestHarness};

    #[test]
    fn test_assertions_on_fresh_run() {
        let mut harness = TestHarness::new(scenario_catalog()).configured();
        harness.controller.start().unwrap();
        let snapshot = harness.controller.snapshot();

        assert_phase(&snapshot, RunPhase::Running);
        assert_stage_status(&snapshot, "s1", StageStatus::Active);
        assert_stage_status(&snapshot, "s2", StageStatus::Pending);
        assert_single_active(&snapshot);
        assert_ordered_activation(&snapshot);
        assert_aggregate_progress(&snapshot, 0.0);
        assert_event_sequence(&harness.sink, &["run.started", "stage.activated"]);
    }

    #[test]
    #[should_panic(expected = "is not in the snapshot")]
    fn test_unknown_stage_panics() {
        let harness = TestHarness::new(scenario_catalog());
        assert_stage_status(&harness.controller.snapshot(), "nope", StageStatus::Pending);
    }
}
