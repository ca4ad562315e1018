//! State owned by one run.

use super::RunInputs;
use crate::core::RunPhase;
use crate::review::ReviewGate;
use crate::sequencer::StageSequencer;
use crate::utils::Timestamp;
use uuid::Uuid;

/// Everything belonging to one execution of the stage sequence.
///
/// Created by `RunController::start` and dropped by `reset`.
#[derive(Debug, Clone)]
pub struct RunState {
    pub(crate) run_id: Uuid,
    pub(crate) generation: u64,
    pub(crate) phase: RunPhase,
    pub(crate) inputs: RunInputs,
    pub(crate) sequencer: StageSequencer,
    pub(crate) gate: ReviewGate,
    pub(crate) started_at: Timestamp,
}

impl RunState {
    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the generation ticks must carry to apply to this run.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Returns the inputs the run was started with.
    #[must_use]
    pub fn inputs(&self) -> &RunInputs {
        &self.inputs
    }

    /// Returns the stage sequencer.
    #[must_use]
    pub fn sequencer(&self) -> &StageSequencer {
        &self.sequencer
    }

    /// Returns the review gate.
    #[must_use]
    pub fn gate(&self) -> &ReviewGate {
        &self.gate
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }
}
