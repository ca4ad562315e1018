//! End-to-end tests driving the run controller.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::catalog::{StageCatalog, StageDefinition};
use crate::core::{Confidence, RunEvent, RunPhase, StageId, StageOutput, StageStatus};
use crate::errors::GateflowError;
use crate::events::CollectingEventSink;
use crate::progress::{IntervalTickSource, Tick};
use crate::testing::{
    assert_aggregate_progress, assert_event_sequence, assert_ordered_activation, assert_phase,
    assert_single_active, assert_stage_status, drive_until_idle, scenario_catalog,
    TestHarness,
};

fn started(catalog: StageCatalog) -> TestHarness {
    let mut harness = TestHarness::new(catalog).configured();
    harness.controller.start().unwrap();
    harness
}

#[tokio::test]
async fn test_review_gate_blocks_submission_until_approved() {
    let mut harness = started(scenario_catalog());
    harness.drive().await;

    let controller = &mut harness.controller;
    assert_eq!(controller.phase(), RunPhase::AwaitingReview);
    assert!(!controller.is_ready_for_submission());

    let err = controller.submit().unwrap_err();
    assert!(matches!(
        err,
        GateflowError::ReviewIncomplete { ref pending } if pending == &vec!["s2".to_string()]
    ));
    assert_eq!(controller.phase(), RunPhase::AwaitingReview);

    let change = controller.set_approval("s2", true, None).unwrap();
    assert!(change.ready_for_submission);
    assert!(controller.is_ready_for_submission());

    let run_id = controller.submit().unwrap();
    assert_eq!(Some(run_id), controller.run_id());
    assert_eq!(controller.phase(), RunPhase::Submitted);
}

#[tokio::test]
async fn test_override_flag_survives_reapproval() {
    let mut harness = started(scenario_catalog());
    harness.drive().await;
    let controller = &mut harness.controller;

    controller.set_approval("s2", true, None).unwrap();
    let revoked = controller.set_approval("s2", false, None).unwrap();
    assert!(revoked.overridden);
    assert!(!revoked.approved);
    assert!(!controller.is_ready_for_submission());

    let again = controller.set_approval("s2", true, None).unwrap();
    assert!(again.overridden);
    assert!(again.approved);

    let snapshot = controller.snapshot();
    let record = snapshot.review("s2").unwrap();
    assert!(record.approved);
    assert!(record.overridden);
    assert_eq!(snapshot.review_summary.overridden, vec![StageId::from("s2")]);
}

#[test]
fn test_empty_catalog_completes_on_start() {
    let harness = started(StageCatalog::empty());
    let snapshot = harness.controller.snapshot();

    assert_phase(&snapshot, RunPhase::AwaitingReview);
    assert_aggregate_progress(&snapshot, 100.0);
    assert!(snapshot.reviews.is_empty());
    assert!(snapshot.ready_for_submission);
    assert_event_sequence(&harness.sink, &["run.started", "run.processing_complete"]);
}

#[test]
fn test_empty_catalog_can_submit() {
    let mut harness = started(StageCatalog::empty());
    harness.controller.submit().unwrap();
    assert_eq!(harness.controller.phase(), RunPhase::Submitted);
}

#[test]
fn test_advance_while_active_is_rejected_without_mutation() {
    let mut harness = started(scenario_catalog());
    let controller = &mut harness.controller;
    tokio_test::block_on(controller.step());
    let before = controller.snapshot();

    for _ in 0..3 {
        let err = controller.advance().unwrap_err();
        assert!(matches!(err, GateflowError::InvalidTransition { .. }));
        assert_eq!(controller.snapshot(), before);
    }
}

#[test]
fn test_double_reset_is_idempotent() {
    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.controller.step());

    harness.controller.reset();
    let first = harness.controller.snapshot();
    let first_generation = harness.controller.generation();
    harness.controller.reset();
    let second = harness.controller.snapshot();

    assert_eq!(first, second);
    assert_eq!(harness.controller.generation(), first_generation);
    assert_phase(&first, RunPhase::Setup);
    assert!(first.run_id.is_none());
    assert!(first.stages.iter().all(|s| s.status == StageStatus::Pending));
    assert_eq!(harness.sink.count_of("run.reset"), 1);
}

#[test]
fn test_stages_activate_in_order_with_one_active() {
    let mut harness = started(StageCatalog::underwriting());
    let controller = &mut harness.controller;

    let mut previous_progress = 0.0;
    let mut activations = Vec::new();
    loop {
        let snapshot = controller.snapshot();
        assert_single_active(&snapshot);
        assert_ordered_activation(&snapshot);
        assert!(snapshot.aggregate_progress >= previous_progress);
        if snapshot.phase == RunPhase::Running {
            assert!(snapshot.aggregate_progress < 100.0);
        }
        previous_progress = snapshot.aggregate_progress;

        if let Some(active) = snapshot.active_stage {
            if activations.last() != Some(&active) {
                activations.push(active);
            }
        }

        match tokio_test::block_on(controller.step()) {
            TickOutcome::RunComplete | TickOutcome::Idle => break,
            _ => {}
        }
    }

    assert_eq!(activations, vec![0, 1, 2, 3]);
    assert_eq!(controller.aggregate_progress(), 100.0);
}

#[test]
fn test_first_stage_active_right_after_start() {
    let harness = started(StageCatalog::underwriting());
    let snapshot = harness.controller.snapshot();

    assert_eq!(snapshot.active_stage, Some(0));
    assert_stage_status(&snapshot, "pfs-analysis", StageStatus::Active);
    assert_stage_status(&snapshot, "credit-analysis", StageStatus::Pending);
    let pfs = snapshot.stage("pfs-analysis").unwrap();
    assert_eq!(pfs.completion_percent, 0);
    assert_eq!(pfs.current_subtask.as_deref(), Some("Reading uploaded PFS document"));
}

#[test]
fn test_completed_stage_reports_full_progress() {
    let mut harness = started(scenario_catalog());
    let outcomes = tokio_test::block_on(harness.drive());

    assert_eq!(outcomes.last(), Some(&TickOutcome::RunComplete));
    let snapshot = harness.controller.snapshot();
    for stage in &snapshot.stages {
        assert_eq!(stage.status, StageStatus::Completed);
        assert_eq!(stage.completion_percent, 100);
        assert_eq!(stage.current_subtask_index, 1);
        assert!(stage.current_subtask.is_none());
        assert!(stage.output.is_some());
        assert!(stage.elapsed_ms.is_some());
    }
}

#[test]
fn test_progress_never_reaches_100_while_active() {
    let mut harness = started(scenario_catalog());
    let controller = &mut harness.controller;

    loop {
        match tokio_test::block_on(controller.step()) {
            TickOutcome::Progressed { percent, .. } => assert!(percent < 100),
            TickOutcome::StageCompleted { .. } => {}
            _ => break,
        }
        let snapshot = controller.snapshot();
        for stage in snapshot.stages.iter().filter(|s| s.status == StageStatus::Active) {
            assert!(stage.completion_percent < 100);
        }
    }
}

#[test]
fn test_processing_complete_emitted_once_with_full_progress() {
    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.drive());

    let completions = harness.sink.events_of_type("run.processing_complete");
    assert_eq!(completions, vec![RunEvent::RunProcessingComplete { stages_processed: 2 }]);

    let last_completed = harness
        .sink
        .events_of_type("stage.completed")
        .into_iter()
        .last()
        .unwrap();
    let RunEvent::StageCompleted {
        aggregate_progress, ..
    } = last_completed
    else {
        panic!("expected stage.completed");
    };
    assert_eq!(aggregate_progress, 100.0);
}

#[test]
fn test_stale_ticks_after_reset_are_discarded() {
    let mut harness = started(scenario_catalog());
    let controller = &mut harness.controller;
    let old_generation = controller.generation();
    tokio_test::block_on(controller.step());

    controller.reset();
    controller.start().unwrap();
    assert!(controller.generation() > old_generation);
    let fresh = controller.snapshot();

    for _ in 0..200 {
        let outcome = controller.handle_tick(Tick {
            generation: old_generation,
            stage: 0,
        });
        assert_eq!(outcome, TickOutcome::Discarded);
    }
    assert_eq!(controller.snapshot(), fresh);
}

#[test]
fn test_tick_for_inactive_stage_is_discarded() {
    let mut harness = started(scenario_catalog());
    let controller = &mut harness.controller;
    let generation = controller.generation();

    let outcome = controller.handle_tick(Tick { generation, stage: 1 });
    assert_eq!(outcome, TickOutcome::Discarded);
    assert_stage_status(&controller.snapshot(), "s2", StageStatus::Pending);
}

#[test]
fn test_ticks_after_processing_complete_are_discarded() {
    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.drive());
    let controller = &mut harness.controller;
    let before = controller.snapshot();

    let outcome = controller.handle_tick(Tick {
        generation: controller.generation(),
        stage: 1,
    });
    assert_eq!(outcome, TickOutcome::Discarded);
    assert_eq!(controller.snapshot(), before);
}

#[test]
fn test_manual_advance_mode() {
    let mut harness = TestHarness::new(scenario_catalog())
        .with_config(ControllerConfig::new().with_auto_advance(false))
        .configured();
    harness.controller.start().unwrap();

    let outcomes = tokio_test::block_on(harness.drive());
    assert_eq!(outcomes.last(), Some(&TickOutcome::Idle));
    assert!(outcomes.contains(&TickOutcome::StageCompleted { stage: "s1".into() }));

    let controller = &mut harness.controller;
    assert_eq!(controller.phase(), RunPhase::Running);
    assert_eq!(controller.active_stage(), None);
    assert_eq!(controller.aggregate_progress(), 50.0);

    controller.advance().unwrap();
    assert_eq!(controller.active_stage(), Some(1));
    let phase = tokio_test::block_on(controller.run_to_completion()).unwrap();
    assert_eq!(phase, RunPhase::AwaitingReview);
}

#[test]
fn test_advance_outside_running_is_rejected() {
    let mut controller = RunController::underwriting();
    assert!(matches!(
        controller.advance(),
        Err(GateflowError::InvalidTransition { .. })
    ));

    let mut harness = started(StageCatalog::empty());
    assert!(harness.controller.advance().is_err());
}

#[test]
fn test_review_commands_validate_stage_and_phase() {
    let mut controller = RunController::underwriting();
    assert!(matches!(
        controller.set_approval("mortgage-calc", true, None),
        Err(GateflowError::InvalidTransition { .. })
    ));

    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.drive());
    let controller = &mut harness.controller;

    assert!(matches!(
        controller.set_approval("s1", true, None),
        Err(GateflowError::UnknownStage { .. })
    ));
    assert!(matches!(
        controller.set_approval("missing", true, None),
        Err(GateflowError::UnknownStage { .. })
    ));

    controller
        .set_approval("s2", true, Some("verified DTI".to_string()))
        .unwrap();
    controller.set_overall_comment("looks good").unwrap();
    controller.submit().unwrap();

    assert!(matches!(controller.submit(), Err(GateflowError::AlreadySubmitted)));
    assert!(matches!(
        controller.set_approval("s2", false, None),
        Err(GateflowError::InvalidTransition { .. })
    ));
    assert!(controller.set_overall_comment("late").is_err());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.review("s2").unwrap().comment.as_deref(), Some("verified DTI"));
    assert_eq!(snapshot.overall_comment.as_deref(), Some("looks good"));
    assert_eq!(harness.sink.count_of("run.submitted"), 1);
}

#[test]
fn test_submit_while_running_is_rejected() {
    let mut harness = started(scenario_catalog());
    assert!(matches!(
        harness.controller.submit(),
        Err(GateflowError::InvalidTransition { .. })
    ));
    assert!(matches!(
        RunController::underwriting().submit(),
        Err(GateflowError::InvalidTransition { .. })
    ));
}

#[test]
fn test_readiness_mid_run_does_not_allow_submission() {
    let catalog = StageCatalog::new(vec![
        StageDefinition::new("s1", "One").with_subtask("a"),
        StageDefinition::new("s2", "Two").with_subtask("b"),
    ])
    .unwrap();
    let mut harness = TestHarness::new(catalog)
        .with_config(ControllerConfig::new().with_auto_advance(false))
        .configured();
    harness.controller.start().unwrap();
    tokio_test::block_on(harness.drive());

    let controller = &mut harness.controller;
    assert_eq!(controller.phase(), RunPhase::Running);
    assert!(controller.is_ready_for_submission());
    assert!(controller.snapshot().ready_for_submission);
    assert!(matches!(
        controller.submit(),
        Err(GateflowError::InvalidTransition { .. })
    ));
    assert_eq!(controller.phase(), RunPhase::Running);
}

#[test]
fn test_approval_mid_run_signals_readiness() {
    let catalog = StageCatalog::new(vec![
        StageDefinition::new("gated", "Gated").with_subtask("a").requiring_review(),
        StageDefinition::new("tail", "Tail").with_subtask("b"),
    ])
    .unwrap();
    let mut harness = TestHarness::new(catalog)
        .with_config(ControllerConfig::new().with_auto_advance(false))
        .configured();
    harness.controller.start().unwrap();
    tokio_test::block_on(harness.drive());
    assert!(!harness.controller.is_ready_for_submission());

    let change = harness.controller.set_approval("gated", true, None).unwrap();
    assert!(change.ready_for_submission);
    assert!(harness.controller.is_ready_for_submission());
    assert!(harness.controller.submit().is_err());
}

#[test]
fn test_provider_output_can_request_review() {
    let provider = StaticOutputProvider::new(StageOutput::new(Confidence::High))
        .with_output("s1", StageOutput::new(Confidence::Low).requiring_review());
    let mut harness = TestHarness::with_provider(scenario_catalog(), provider).configured();
    harness.controller.start().unwrap();
    tokio_test::block_on(harness.drive());

    let summary = harness.controller.review_summary();
    assert_eq!(summary.pending, vec![StageId::from("s1"), StageId::from("s2")]);
    assert_eq!(summary.reviewed, 0);
    assert_eq!(
        harness.controller.snapshot().review("s1").unwrap().confidence,
        Confidence::Low
    );
}

#[test]
fn test_start_without_configuration_is_rejected() {
    let mut harness = TestHarness::new(scenario_catalog());
    let err = harness.controller.start().unwrap_err();

    assert!(matches!(err, GateflowError::ConfigurationIncomplete { .. }));
    assert!(err.is_recoverable());
    assert!(harness.sink.is_empty());
    assert_phase(&harness.controller.snapshot(), RunPhase::Setup);
}

#[test]
fn test_reset_keeps_setup_inputs() {
    let mut harness = TestHarness::new(scenario_catalog()).configured();
    harness
        .controller
        .add_inputs([
            InputReference::new("pfs.pdf", DocumentCategory::Pfs),
            InputReference::new("report.pdf", DocumentCategory::Credit),
        ])
        .unwrap();
    let first = harness.controller.start().unwrap();
    harness.controller.reset();

    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.configuration.product_type, "jumbo-mortgage");
    assert_eq!(snapshot.inputs.total(), 2);

    let second = harness.controller.start().unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_event_sequence_for_full_run() {
    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.drive());
    harness.controller.set_approval("s2", true, None).unwrap();
    harness.controller.submit().unwrap();
    harness.controller.reset();

    assert_event_sequence(
        &harness.sink,
        &[
            "run.started",
            "stage.activated",
            "stage.completed",
            "stage.activated",
            "stage.completed",
            "review.changed",
            "run.processing_complete",
            "review.changed",
            "run.submitted",
            "run.reset",
        ],
    );
    // 2% per tick: 49 progress ticks per stage before completion.
    assert_eq!(harness.sink.count_of("stage.progress"), 98);
}

#[test]
fn test_events_serialize_with_dotted_type() {
    let mut harness = started(scenario_catalog());
    tokio_test::block_on(harness.controller.step());

    let events = harness.sink.events();
    let values: Vec<_> = events.iter().map(RunEvent::to_value).collect();
    assert_eq!(values[0]["type"], "run.started");
    assert_eq!(values[1]["type"], "stage.activated");
    assert_eq!(values[2]["type"], "stage.progress");
    assert_eq!(values[2]["percent"], 2);
}

#[test]
fn test_mock_provider_sees_every_stage_in_order() {
    let mut provider = MockStageOutputProvider::new();
    let mut sequence = mockall::Sequence::new();
    for id in ["s1", "s2"] {
        provider
            .expect_compute_stage_output()
            .withf(move |stage, _| stage.id == id)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| StageOutput::new(Confidence::Medium));
    }

    let mut harness = TestHarness::with_provider(scenario_catalog(), provider).configured();
    harness.controller.start().unwrap();
    tokio_test::block_on(harness.drive());
    assert_eq!(harness.controller.phase(), RunPhase::AwaitingReview);
}

#[test]
fn test_full_underwriting_run() {
    let sink = Arc::new(CollectingEventSink::new());
    let mut controller = RunController::underwriting()
        .with_config(ControllerConfig::new().with_progress_increment(10))
        .with_event_sink(sink.clone());
    controller
        .configure("jumbo-mortgage", ["w2", "self-employed"])
        .unwrap();
    controller
        .add_inputs([InputReference::new("pfs.pdf", DocumentCategory::Pfs)])
        .unwrap();
    controller.start().unwrap();

    tokio_test::block_on(drive_until_idle(&mut controller));
    let snapshot = controller.snapshot();
    assert_phase(&snapshot, RunPhase::AwaitingReview);
    assert_eq!(snapshot.review_summary.pending, vec![StageId::from("mortgage-calc")]);
    assert_eq!(snapshot.review_summary.reviewed, 3);
    assert_eq!(
        snapshot
            .stage("pfs-analysis")
            .and_then(|s| s.output.as_ref())
            .and_then(|o| o.get("documentsReviewed")),
        Some(&serde_json::json!(1))
    );

    controller.set_approval("mortgage-calc", true, None).unwrap();
    controller.submit().unwrap();
    assert!(controller.snapshot().review_summary.is_fully_reviewed());

    let json = serde_json::to_value(controller.snapshot()).unwrap();
    assert_eq!(json["phase"], "submitted");
    assert_eq!(json["stages"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_run_to_completion_with_manual_ticks() {
    let mut harness = started(StageCatalog::underwriting());
    let phase = harness.controller.run_to_completion().await.unwrap();

    assert_eq!(phase, RunPhase::AwaitingReview);
    assert_eq!(harness.sink.count_of("stage.completed"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_run_to_completion_with_interval_ticks() {
    let catalog = StageCatalog::new(vec![
        StageDefinition::new("fast", "Fast")
            .with_subtasks(["a", "b"])
            .with_duration(Duration::from_millis(100)),
        StageDefinition::new("slow", "Slow")
            .with_subtask("c")
            .with_duration(Duration::from_millis(200))
            .requiring_review(),
    ])
    .unwrap();

    let sink = Arc::new(CollectingEventSink::new());
    let mut controller = RunController::new(
        catalog,
        StaticOutputProvider::new(StageOutput::new(Confidence::High)),
    )
    .with_config(ControllerConfig::new().with_progress_increment(25))
    .with_event_sink(sink.clone())
    .with_tick_source(IntervalTickSource::new());
    controller.configure("jumbo", ["w2"]).unwrap();
    controller.start().unwrap();

    let started_at = tokio::time::Instant::now();
    let phase = controller.run_to_completion().await.unwrap();

    assert_eq!(phase, RunPhase::AwaitingReview);
    assert!(started_at.elapsed() >= Duration::from_millis(300));
    assert_eq!(sink.count_of("stage.progress"), 6);
    assert!(!controller.is_ready_for_submission());
}
