//! Test fixtures for run testing.

use std::sync::Arc;

use crate::catalog::{StageCatalog, StageDefinition};
use crate::core::{Confidence, StageOutput};
use crate::events::CollectingEventSink;
use crate::progress::ManualTickSource;
use crate::run::{
    ControllerConfig, RunController, StageOutputProvider, StaticOutputProvider, TickOutcome,
};

/// Two stages: `s1` auto-approves, `s2` requires review.
#[must_use]
#[allow(clippy::expect_used)]
pub fn scenario_catalog() -> StageCatalog {
    StageCatalog::new(vec![
        StageDefinition::new("s1", "Stage One").with_subtasks(["a", "b"]),
        StageDefinition::new("s2", "Stage Two")
            .with_subtasks(["c", "d"])
            .requiring_review(),
    ])
    .expect("scenario catalog is valid")
}

/// One stage with a single sub-task and no review.
#[must_use]
#[allow(clippy::expect_used)]
pub fn single_stage_catalog() -> StageCatalog {
    StageCatalog::new(vec![StageDefinition::new("only", "Only Stage").with_subtask("work")])
        .expect("single stage catalog is valid")
}

/// A controller over a manual tick source with its events captured.
pub struct TestHarness {
    /// The controller under test.
    pub controller: RunController,
    /// Every event the controller emitted.
    pub sink: Arc<CollectingEventSink>,
}

impl TestHarness {
    /// Wraps `catalog` with a provider returning high-confidence outputs.
    #[must_use]
    pub fn new(catalog: StageCatalog) -> Self {
        Self::with_provider(catalog, StaticOutputProvider::new(StageOutput::new(Confidence::High)))
    }

    /// Wraps `catalog` with a custom provider.
    #[must_use]
    pub fn with_provider(
        catalog: StageCatalog,
        provider: impl StageOutputProvider + 'static,
    ) -> Self {
        let sink = Arc::new(CollectingEventSink::new());
        let controller = RunController::new(catalog, provider)
            .with_event_sink(sink.clone())
            .with_tick_source(ManualTickSource::new());
        Self { controller, sink }
    }

    /// Replaces the controller configuration.
    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.controller = self.controller.with_config(config);
        self
    }

    /// Fills in a complete setup configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn configured(mut self) -> Self {
        self.controller
            .configure("jumbo-mortgage", ["w2"])
            .expect("controller is in setup");
        self
    }

    /// Drives the tick source until it goes idle or the run leaves the
    /// running phase. Returns every outcome in order.
    pub async fn drive(&mut self) -> Vec<TickOutcome> {
        drive_until_idle(&mut self.controller).await
    }
}

/// Steps `controller` until no tick is produced or the run completes.
pub async fn drive_until_idle(controller: &mut RunController) -> Vec<TickOutcome> {
    let mut outcomes = Vec::new();
    loop {
        let outcome = controller.step().await;
        let done = matches!(outcome, TickOutcome::Idle | TickOutcome::RunComplete);
        outcomes.push(outcome);
        if done {
            return outcomes;
        }
    }
}
