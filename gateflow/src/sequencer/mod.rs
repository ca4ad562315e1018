//! Stage sequencing state machine.
//!
//! The sequencer owns the runtime state of every stage in a run and enforces
//! strict ordering: at most one stage is active, and stage `k` only becomes
//! active once stage `k - 1` has completed.

mod state;

pub use state::StageRuntimeState;

use crate::catalog::StageCatalog;
use crate::core::{StageId, StageOutput, StageStatus};
use crate::errors::GateflowError;
use crate::progress::{ProgressSimulator, SimulatorStep, Tick, TickSchedule};
use crate::utils::now_utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a successful `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A stage became active; its ticks should follow `schedule`.
    Activated {
        /// The activated stage.
        stage: StageId,
        /// Ordinal of the activated stage.
        ordinal: usize,
        /// Tick schedule for the stage.
        schedule: TickSchedule,
    },
    /// The catalog is empty; the run is trivially complete.
    RunComplete,
}

/// Outcome of routing a tick through the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerStep {
    /// Tick did not apply to the active stage.
    Ignored,
    /// Active stage progressed.
    Progress {
        /// Ordinal of the active stage.
        ordinal: usize,
        /// New percentage (below 100).
        percent: u8,
        /// Current sub-task index.
        subtask_index: usize,
    },
    /// Active stage reached 100%; call `on_stage_progress_complete`.
    ProgressComplete {
        /// Ordinal of the finished stage.
        ordinal: usize,
    },
}

/// Result of completing a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCompletion {
    /// The completed stage.
    pub stage: StageId,
    /// Ordinal of the completed stage.
    pub ordinal: usize,
    /// Aggregate progress after the completion.
    pub aggregate_progress: f64,
    /// True when this was the last stage.
    pub run_complete: bool,
}

/// Sequences stage execution for a single run.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    catalog: Arc<StageCatalog>,
    states: Vec<StageRuntimeState>,
    active: Option<usize>,
    simulator: ProgressSimulator,
    generation: u64,
    run_complete: bool,
}

impl StageSequencer {
    /// Creates a sequencer with every stage pending.
    #[must_use]
    pub fn new(catalog: Arc<StageCatalog>, simulator: ProgressSimulator, generation: u64) -> Self {
        let states = catalog.iter().map(StageRuntimeState::pending).collect();
        Self {
            catalog,
            states,
            active: None,
            simulator,
            generation,
            run_complete: false,
        }
    }

    /// Activates the next pending stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` while a stage is active or once every
    /// stage has completed. State is left untouched.
    pub fn advance(&mut self) -> Result<Advance, GateflowError> {
        if let Some(active) = self.active {
            return Err(GateflowError::invalid_transition(
                "advance",
                format!("stage '{}' is still active", self.states[active].stage),
            ));
        }

        if self.states.is_empty() && !self.run_complete {
            info!(generation = self.generation, "empty catalog, run trivially complete");
            self.run_complete = true;
            return Ok(Advance::RunComplete);
        }

        let Some(ordinal) = self
            .states
            .iter()
            .position(|s| s.status == StageStatus::Pending)
        else {
            return Err(GateflowError::invalid_transition(
                "advance",
                "all stages are completed",
            ));
        };

        let Some(definition) = self.catalog.at(ordinal) else {
            return Err(GateflowError::invalid_transition(
                "advance",
                format!("stage ordinal {ordinal} is not in the catalog"),
            ));
        };

        self.states[ordinal].transition(StageStatus::Active)?;
        let schedule = self.simulator.start(self.generation, definition);
        let state = &mut self.states[ordinal];
        state.completion_percent = 0;
        state.current_subtask_index = 0;
        state.started_at = Some(now_utc());
        self.active = Some(ordinal);

        info!(stage = %state.stage, ordinal, "stage activated");

        Ok(Advance::Activated {
            stage: state.stage.clone(),
            ordinal,
            schedule,
        })
    }

    /// Routes a tick to the active stage.
    pub fn apply_tick(&mut self, tick: Tick) -> SequencerStep {
        let Some(ordinal) = self.active else {
            return SequencerStep::Ignored;
        };
        if tick.generation != self.generation || tick.stage != ordinal {
            return SequencerStep::Ignored;
        }

        match self.simulator.tick(tick) {
            SimulatorStep::Ignored => SequencerStep::Ignored,
            SimulatorStep::Progress {
                percent,
                subtask_index,
            } => {
                let state = &mut self.states[ordinal];
                state.completion_percent = state.completion_percent.max(percent);
                state.current_subtask_index = subtask_index;
                debug!(stage = %state.stage, percent, subtask_index, "stage progress");
                SequencerStep::Progress {
                    ordinal,
                    percent: state.completion_percent,
                    subtask_index,
                }
            }
            SimulatorStep::Complete => SequencerStep::ProgressComplete { ordinal },
        }
    }

    /// Marks the active stage completed and attaches its output.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `ordinal` is not the active stage.
    pub fn on_stage_progress_complete(
        &mut self,
        ordinal: usize,
        output: StageOutput,
    ) -> Result<StageCompletion, GateflowError> {
        if self.active != Some(ordinal) {
            return Err(GateflowError::invalid_transition(
                "complete stage",
                format!("stage ordinal {ordinal} is not active"),
            ));
        }

        self.states[ordinal].transition(StageStatus::Completed)?;
        self.simulator.cancel();
        self.active = None;

        let state = &mut self.states[ordinal];
        state.completion_percent = 100;
        state.current_subtask_index = state.subtask_count.saturating_sub(1);
        state.output = Some(output);
        state.completed_at = Some(now_utc());
        let stage = state.stage.clone();

        self.run_complete = self.states.iter().all(StageRuntimeState::is_completed);

        let aggregate_progress = self.aggregate_progress();
        info!(stage = %stage, ordinal, aggregate_progress, "stage completed");

        Ok(StageCompletion {
            stage,
            ordinal,
            aggregate_progress,
            run_complete: self.run_complete,
        })
    }

    /// Returns overall run progress in percent.
    ///
    /// Exactly `100.0` once run completion has been reported.
    #[must_use]
    pub fn aggregate_progress(&self) -> f64 {
        if self.run_complete {
            return 100.0;
        }
        if self.states.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let progress = self.completed_count() as f64 / self.states.len() as f64 * 100.0;
        progress
    }

    /// Returns the runtime state of every stage in order.
    #[must_use]
    pub fn states(&self) -> &[StageRuntimeState] {
        &self.states
    }

    /// Returns the runtime state at `ordinal`.
    #[must_use]
    pub fn state(&self, ordinal: usize) -> Option<&StageRuntimeState> {
        self.states.get(ordinal)
    }

    /// Returns the ordinal of the active stage.
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Returns the number of completed stages.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_completed()).count()
    }

    /// Returns true once every stage has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.run_complete
    }

    /// Returns the generation this sequencer belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the catalog being sequenced.
    #[must_use]
    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }
}
