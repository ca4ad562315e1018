//! Run lifecycle façade.

use super::{
    ControllerConfig, InputCounts, InputReference, RunConfiguration, RunInputs, RunSnapshot,
    RunState, StageOutputProvider, StageSnapshot, UnderwritingOutputProvider,
};
use crate::catalog::StageCatalog;
use crate::core::{RunEvent, RunPhase, StageId};
use crate::errors::GateflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::RunSpanAttributes;
use crate::progress::{ManualTickSource, ProgressSimulator, Tick, TickSource};
use crate::review::{ReviewChange, ReviewGate, ReviewSummary};
use crate::sequencer::{Advance, SequencerStep, StageSequencer};
use crate::utils::now_utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument, Span};
use uuid::Uuid;

/// Outcome of handling one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick source had nothing scheduled.
    Idle,
    /// The tick was stale or did not apply to the active stage.
    Discarded,
    /// The active stage progressed.
    Progressed {
        /// The active stage.
        stage: StageId,
        /// New percentage.
        percent: u8,
    },
    /// A stage completed and more stages remain.
    StageCompleted {
        /// The completed stage.
        stage: StageId,
    },
    /// The last stage completed; the run awaits review.
    RunComplete,
}

/// Drives a run through Setup -> Running -> AwaitingReview -> Submitted.
///
/// All state mutation goes through `&mut self`, so every command and tick is
/// applied on a single ordered timeline.
pub struct RunController {
    catalog: Arc<StageCatalog>,
    config: ControllerConfig,
    provider: Box<dyn StageOutputProvider>,
    sink: Arc<dyn EventSink>,
    ticks: Box<dyn TickSource>,
    configuration: RunConfiguration,
    documents: Vec<InputReference>,
    run: Option<RunState>,
    generation: u64,
}

impl RunController {
    /// Creates a controller in setup for `catalog`.
    pub fn new(catalog: StageCatalog, provider: impl StageOutputProvider + 'static) -> Self {
        Self {
            catalog: Arc::new(catalog),
            config: ControllerConfig::default(),
            provider: Box::new(provider),
            sink: Arc::new(NoOpEventSink),
            ticks: Box::new(ManualTickSource::new()),
            configuration: RunConfiguration::default(),
            documents: Vec::new(),
            run: None,
            generation: 0,
        }
    }

    /// Creates a controller for the built-in underwriting catalog.
    #[must_use]
    pub fn underwriting() -> Self {
        Self::new(StageCatalog::underwriting(), UnderwritingOutputProvider)
    }

    /// Sets the controller configuration. Validated on `start`.
    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the tick source.
    #[must_use]
    pub fn with_tick_source(mut self, source: impl TickSource + 'static) -> Self {
        self.ticks = Box::new(source);
        self
    }

    /// Sets the product type and income categories.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside setup.
    pub fn configure(
        &mut self,
        product_type: impl Into<String>,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), GateflowError> {
        self.ensure_setup("configure")?;
        self.configuration = RunConfiguration::new(product_type, categories);
        debug!(
            product_type = %self.configuration.product_type,
            categories = ?self.configuration.categories,
            "run configured"
        );
        Ok(())
    }

    /// Adds finalized document references from intake.
    ///
    /// Returns the total number of documents.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside setup.
    pub fn add_inputs(
        &mut self,
        inputs: impl IntoIterator<Item = InputReference>,
    ) -> Result<usize, GateflowError> {
        self.ensure_setup("add inputs")?;
        self.documents.extend(inputs);
        Ok(self.documents.len())
    }

    /// Starts a run and activates the first stage.
    ///
    /// An empty catalog is a valid run that completes immediately.
    ///
    /// # Errors
    ///
    /// `ConfigurationIncomplete` when product type or categories are missing,
    /// `InvalidConfig` for a bad controller configuration, `InvalidTransition`
    /// when a run already exists.
    pub fn start(&mut self) -> Result<Uuid, GateflowError> {
        if let Some(run) = &self.run {
            let err = GateflowError::invalid_transition(
                "start",
                format!("run is {}; reset first", run.phase),
            );
            return Err(self.reject(err));
        }
        if let Err(err) = self
            .configuration
            .validate()
            .and_then(|()| self.config.validate())
        {
            return Err(self.reject(err));
        }

        self.ticks.cancel();
        self.generation += 1;

        let run_id = Uuid::new_v4();
        self.run = Some(RunState {
            run_id,
            generation: self.generation,
            phase: RunPhase::Running,
            inputs: RunInputs {
                configuration: self.configuration.clone(),
                documents: self.documents.clone(),
            },
            sequencer: StageSequencer::new(
                Arc::clone(&self.catalog),
                ProgressSimulator::new(self.config.progress_increment),
                self.generation,
            ),
            gate: ReviewGate::new(self.catalog.len()),
            started_at: now_utc(),
        });

        info!(
            %run_id,
            generation = self.generation,
            stages = self.catalog.len(),
            documents = self.documents.len(),
            "run started"
        );
        self.emit(RunEvent::RunStarted {
            run_id,
            stage_count: self.catalog.len(),
            product_type: self.configuration.product_type.clone(),
        });

        self.activate_next()?;
        Ok(run_id)
    }

    /// Activates the next pending stage.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the running phase or while a stage is
    /// active. State is unchanged on error.
    pub fn advance(&mut self) -> Result<(), GateflowError> {
        let phase = self.phase();
        if phase != RunPhase::Running {
            let err = GateflowError::invalid_transition("advance", format!("run is {phase}"));
            return Err(self.reject(err));
        }
        self.activate_next().map_err(|err| self.reject(err))
    }

    /// Applies one tick to the active stage.
    ///
    /// Ticks from another generation, for a stage that is not active, or
    /// arriving outside the running phase are discarded.
    pub fn handle_tick(&mut self, tick: Tick) -> TickOutcome {
        let Some(run) = self.run.as_mut() else {
            debug!(?tick, "tick discarded: no run");
            return TickOutcome::Discarded;
        };
        if run.generation != tick.generation || run.phase != RunPhase::Running {
            debug!(?tick, generation = run.generation, "tick discarded: stale");
            return TickOutcome::Discarded;
        }

        match run.sequencer.apply_tick(tick) {
            SequencerStep::Ignored => TickOutcome::Discarded,
            SequencerStep::Progress {
                ordinal,
                percent,
                subtask_index,
            } => {
                let Some(stage) = self.catalog.at(ordinal).map(|d| d.id.clone()) else {
                    return TickOutcome::Discarded;
                };
                self.emit(RunEvent::StageProgressTick {
                    stage: stage.clone(),
                    percent,
                    subtask_index,
                });
                TickOutcome::Progressed { stage, percent }
            }
            SequencerStep::ProgressComplete { ordinal } => self.complete_stage(ordinal),
        }
    }

    /// Pulls one tick from the tick source and applies it.
    pub async fn step(&mut self) -> TickOutcome {
        match self.ticks.next_tick().await {
            Some(tick) => self.handle_tick(tick),
            None => TickOutcome::Idle,
        }
    }

    /// Drives ticks until the run leaves the running phase.
    ///
    /// Without auto-advance this stops after each completed stage; call
    /// `advance` and drive again.
    ///
    /// # Errors
    ///
    /// Propagates errors from automatic advancement.
    pub async fn run_to_completion(&mut self) -> Result<RunPhase, GateflowError> {
        let span = self
            .run
            .as_ref()
            .map_or_else(Span::none, |run| RunSpanAttributes::from_run(run).span());

        async {
            while self.phase() == RunPhase::Running {
                if self.active_stage().is_none() {
                    if !self.config.auto_advance {
                        break;
                    }
                    self.advance()?;
                    continue;
                }
                if self.step().await == TickOutcome::Idle {
                    break;
                }
            }
            Ok::<_, GateflowError>(self.phase())
        }
        .instrument(span)
        .await
    }

    /// Records a checker decision.
    ///
    /// # Errors
    ///
    /// `UnknownStage` when the stage has no review record, `InvalidTransition`
    /// without a run or after submission.
    pub fn set_approval(
        &mut self,
        stage: &str,
        approved: bool,
        comment: Option<String>,
    ) -> Result<ReviewChange, GateflowError> {
        let result = match self.run.as_mut() {
            Some(run) => run.gate.set_approval(stage, approved, comment),
            None => Err(GateflowError::invalid_transition(
                "set approval",
                "no run in progress",
            )),
        };
        self.publish_review(result)
    }

    /// Attaches a reviewer note to a gated stage.
    ///
    /// # Errors
    ///
    /// Same as [`set_approval`](Self::set_approval).
    pub fn set_comment(
        &mut self,
        stage: &str,
        comment: impl Into<String>,
    ) -> Result<ReviewChange, GateflowError> {
        let result = match self.run.as_mut() {
            Some(run) => run.gate.set_comment(stage, comment),
            None => Err(GateflowError::invalid_transition("comment", "no run in progress")),
        };
        self.publish_review(result)
    }

    /// Sets the run-level reviewer note.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` without a run or after submission.
    pub fn set_overall_comment(&mut self, comment: impl Into<String>) -> Result<(), GateflowError> {
        let result = match self.run.as_mut() {
            Some(run) => run.gate.set_overall_comment(comment),
            None => Err(GateflowError::invalid_transition("comment", "no run in progress")),
        };
        result.map_err(|err| self.reject(err))
    }

    /// Submits the reviewed run. Irreversible.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` before processing completes, `ReviewIncomplete`
    /// while a gated stage is unapproved, `AlreadySubmitted` on repeat calls.
    pub fn submit(&mut self) -> Result<Uuid, GateflowError> {
        let result = match self.run.as_mut() {
            None => Err(GateflowError::invalid_transition("submit", "no run in progress")),
            Some(run) => match run.phase {
                RunPhase::Running | RunPhase::Setup => Err(GateflowError::invalid_transition(
                    "submit",
                    "stages are still processing",
                )),
                RunPhase::Submitted => Err(GateflowError::AlreadySubmitted),
                RunPhase::AwaitingReview => run.gate.submit().map(|()| {
                    run.phase = RunPhase::Submitted;
                    run.run_id
                }),
            },
        };

        let run_id = result.map_err(|err| self.reject(err))?;
        info!(%run_id, "run submitted");
        self.emit(RunEvent::RunSubmitted { run_id });
        Ok(run_id)
    }

    /// Discards the run and returns to setup. Valid from any phase.
    ///
    /// Configuration and intake documents are kept. The generation only
    /// moves when a run was discarded, so repeated resets are no-ops.
    pub fn reset(&mut self) {
        self.ticks.cancel();

        if let Some(run) = self.run.take() {
            self.generation += 1;
            info!(run_id = %run.run_id, phase = %run.phase, "run reset");
            self.emit(RunEvent::RunReset { run_id: run.run_id });
        }
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.run.as_ref().map_or(RunPhase::Setup, |r| r.phase)
    }

    /// Returns the current run, if any.
    #[must_use]
    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Returns the current run id.
    #[must_use]
    pub fn run_id(&self) -> Option<Uuid> {
        self.run.as_ref().map(|r| r.run_id)
    }

    /// Returns the ordinal of the active stage.
    #[must_use]
    pub fn active_stage(&self) -> Option<usize> {
        self.run.as_ref().and_then(|r| r.sequencer.active())
    }

    /// Returns overall run progress in percent.
    #[must_use]
    pub fn aggregate_progress(&self) -> f64 {
        self.run
            .as_ref()
            .map_or(0.0, |r| r.sequencer.aggregate_progress())
    }

    /// True iff a run exists and every existing review record is approved.
    ///
    /// Stages that have not completed yet do not block readiness; `submit`
    /// still requires processing to be complete.
    #[must_use]
    pub fn is_ready_for_submission(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|r| r.gate.is_ready_for_submission())
    }

    /// Returns review progress.
    #[must_use]
    pub fn review_summary(&self) -> ReviewSummary {
        self.run.as_ref().map_or_else(
            || ReviewSummary {
                total: self.catalog.len(),
                ..ReviewSummary::default()
            },
            |r| r.gate.summary(),
        )
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Returns the setup configuration.
    #[must_use]
    pub fn configuration(&self) -> &RunConfiguration {
        &self.configuration
    }

    /// Returns the controller configuration.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns a serializable view of the whole controller state.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        let stages = match &self.run {
            Some(run) => self
                .catalog
                .iter()
                .zip(run.sequencer.states())
                .map(|(def, state)| StageSnapshot::from_state(def, state))
                .collect(),
            None => self.catalog.iter().map(StageSnapshot::pending).collect(),
        };

        RunSnapshot {
            run_id: self.run_id(),
            phase: self.phase(),
            configuration: self.configuration.clone(),
            inputs: InputCounts::from_references(&self.documents),
            aggregate_progress: self.aggregate_progress(),
            active_stage: self.active_stage(),
            stages,
            reviews: self
                .run
                .as_ref()
                .map(|r| r.gate.records().to_vec())
                .unwrap_or_default(),
            review_summary: self.review_summary(),
            overall_comment: self
                .run
                .as_ref()
                .and_then(|r| r.gate.overall_comment().map(ToString::to_string)),
            ready_for_submission: self.is_ready_for_submission(),
        }
    }

    fn activate_next(&mut self) -> Result<(), GateflowError> {
        let advance = match self.run.as_mut() {
            Some(run) => run.sequencer.advance()?,
            None => {
                return Err(GateflowError::invalid_transition(
                    "advance",
                    "no run in progress",
                ))
            }
        };

        match advance {
            Advance::Activated {
                stage,
                ordinal,
                schedule,
            } => {
                self.ticks.schedule(schedule);
                self.emit(RunEvent::StageActivated { stage, ordinal });
            }
            Advance::RunComplete => self.finish_processing(),
        }
        Ok(())
    }

    fn complete_stage(&mut self, ordinal: usize) -> TickOutcome {
        let catalog = Arc::clone(&self.catalog);
        let Some(definition) = catalog.at(ordinal) else {
            return TickOutcome::Discarded;
        };
        let Some(run) = self.run.as_mut() else {
            return TickOutcome::Discarded;
        };

        let output = self.provider.compute_stage_output(definition, &run.inputs);
        let completion = match run.sequencer.on_stage_progress_complete(ordinal, output.clone()) {
            Ok(completion) => completion,
            Err(err) => {
                error!(%err, stage = %definition.id, "stage completion rejected");
                return TickOutcome::Discarded;
            }
        };
        let review = run.gate.register_completed_stage(definition, &output);
        self.ticks.cancel();

        self.emit(RunEvent::StageCompleted {
            stage: completion.stage.clone(),
            output,
            aggregate_progress: completion.aggregate_progress,
        });
        if let Some(change) = review {
            self.emit(RunEvent::ReviewStateChanged {
                stage: change.stage,
                approved: change.approved,
                overridden: change.overridden,
                ready_for_submission: change.ready_for_submission,
            });
        }

        if completion.run_complete {
            self.finish_processing();
            return TickOutcome::RunComplete;
        }

        if self.config.auto_advance {
            if let Err(err) = self.activate_next() {
                warn!(%err, "automatic advance failed");
            }
        }
        TickOutcome::StageCompleted {
            stage: completion.stage,
        }
    }

    fn finish_processing(&mut self) {
        self.ticks.cancel();
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.phase = RunPhase::AwaitingReview;
        let stages_processed = run.sequencer.completed_count();
        let pending = run.gate.pending().len();

        info!(run_id = %run.run_id, stages_processed, pending_reviews = pending, "run processing complete");
        self.emit(RunEvent::RunProcessingComplete { stages_processed });
    }

    fn publish_review(
        &self,
        result: Result<ReviewChange, GateflowError>,
    ) -> Result<ReviewChange, GateflowError> {
        let change = result.map_err(|err| self.reject(err))?;
        self.emit(RunEvent::ReviewStateChanged {
            stage: change.stage.clone(),
            approved: change.approved,
            overridden: change.overridden,
            ready_for_submission: change.ready_for_submission,
        });
        Ok(change)
    }

    fn ensure_setup(&self, action: &str) -> Result<(), GateflowError> {
        match &self.run {
            None => Ok(()),
            Some(run) => Err(self.reject(GateflowError::invalid_transition(
                action,
                format!("run is {}; reset first", run.phase),
            ))),
        }
    }

    fn reject(&self, err: GateflowError) -> GateflowError {
        if err.is_recoverable() {
            warn!(code = err.code(), phase = %self.phase(), %err, "command rejected");
        } else {
            error!(code = err.code(), phase = %self.phase(), %err, "command rejected");
        }
        err
    }

    fn emit(&self, event: RunEvent) {
        self.sink.emit(&event);
    }
}

impl fmt::Debug for RunController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunController")
            .field("phase", &self.phase())
            .field("run_id", &self.run_id())
            .field("generation", &self.generation)
            .field("stages", &self.catalog.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
