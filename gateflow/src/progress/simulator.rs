//! Tick-driven completion percentage for the active stage.

use super::{Tick, TickSchedule};
use crate::catalog::StageDefinition;
use crate::utils::{now_utc, Timestamp};
use std::time::Duration;
use tracing::debug;

/// Percentage added per tick (50 ticks per stage).
pub const DEFAULT_PROGRESS_INCREMENT: u8 = 2;

/// Maps a completion percentage to the sub-task being worked on.
///
/// `floor(percent / 100 * count)` clamped to `[0, count - 1]`. Returns 0 for
/// a stage without sub-tasks.
#[must_use]
pub fn current_subtask(subtask_count: usize, percent: u8) -> usize {
    if subtask_count == 0 {
        return 0;
    }
    let percent = usize::from(percent.min(100));
    (percent * subtask_count / 100).min(subtask_count - 1)
}

/// Result of feeding one tick to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorStep {
    /// Tick was stale, for another stage, or nothing is running.
    Ignored,
    /// Percentage advanced but is still below 100.
    Progress {
        /// New percentage.
        percent: u8,
        /// Sub-task index for the new percentage.
        subtask_index: usize,
    },
    /// The stage reached 100%. The simulator disarms itself.
    Complete,
}

#[derive(Debug, Clone)]
struct ArmedStage {
    generation: u64,
    ordinal: usize,
    subtask_count: usize,
    percent: u8,
    started_at: Timestamp,
}

/// Advances the single active stage's completion percentage.
#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    increment: u8,
    armed: Option<ArmedStage>,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INCREMENT)
    }
}

impl ProgressSimulator {
    /// Creates a simulator adding `increment` percent per tick (clamped to 1..=100).
    #[must_use]
    pub fn new(increment: u8) -> Self {
        Self {
            increment: increment.clamp(1, 100),
            armed: None,
        }
    }

    /// Starts tracking `stage` at 0% and returns the schedule to follow.
    pub fn start(&mut self, generation: u64, stage: &StageDefinition) -> TickSchedule {
        let ticks = self.ticks_per_stage();
        let interval = stage.duration() / ticks;

        self.armed = Some(ArmedStage {
            generation,
            ordinal: stage.ordinal,
            subtask_count: stage.subtask_count(),
            percent: 0,
            started_at: now_utc(),
        });

        debug!(stage = %stage.id, generation, ticks, ?interval, "progress started");

        TickSchedule {
            generation,
            stage: stage.ordinal,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Applies one tick.
    pub fn tick(&mut self, tick: Tick) -> SimulatorStep {
        let Some(armed) = self.armed.as_mut() else {
            return SimulatorStep::Ignored;
        };
        if armed.generation != tick.generation || armed.ordinal != tick.stage {
            return SimulatorStep::Ignored;
        }

        armed.percent = armed.percent.saturating_add(self.increment).min(100);
        if armed.percent >= 100 {
            self.armed = None;
            return SimulatorStep::Complete;
        }

        SimulatorStep::Progress {
            percent: armed.percent,
            subtask_index: current_subtask(armed.subtask_count, armed.percent),
        }
    }

    /// Disarms the simulator; later ticks are ignored.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Returns true while a stage is being tracked.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.armed.is_some()
    }

    /// Returns the current percentage of the tracked stage.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        self.armed.as_ref().map(|a| a.percent)
    }

    /// Returns when the tracked stage was started.
    #[must_use]
    pub fn started_at(&self) -> Option<Timestamp> {
        self.armed.as_ref().map(|a| a.started_at)
    }

    /// Returns the increment applied per tick.
    #[must_use]
    pub fn increment(&self) -> u8 {
        self.increment
    }

    /// Returns how many ticks take a stage from 0 to 100.
    #[must_use]
    pub fn ticks_per_stage(&self) -> u32 {
        u32::from(100_u8.div_ceil(self.increment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> StageDefinition {
        let mut def = StageDefinition::new("mortgage-calc", "Mortgage Calculations")
            .with_subtasks(["dti", "ltv", "cash flow", "affordability"])
            .with_duration(Duration::from_millis(2000));
        def.ordinal = 2;
        def
    }

    #[test]
    fn test_current_subtask_boundaries() {
        assert_eq!(current_subtask(4, 0), 0);
        assert_eq!(current_subtask(4, 24), 0);
        assert_eq!(current_subtask(4, 25), 1);
        assert_eq!(current_subtask(4, 74), 2);
        assert_eq!(current_subtask(4, 75), 3);
        assert_eq!(current_subtask(4, 100), 3);
        assert_eq!(current_subtask(1, 100), 0);
        assert_eq!(current_subtask(3, 33), 0);
        assert_eq!(current_subtask(3, 34), 1);
        assert_eq!(current_subtask(0, 50), 0);
    }

    #[test]
    fn test_start_returns_schedule() {
        let mut sim = ProgressSimulator::default();
        let schedule = sim.start(5, &stage());

        assert_eq!(schedule.generation, 5);
        assert_eq!(schedule.stage, 2);
        assert_eq!(schedule.interval, Duration::from_millis(40));
        assert_eq!(sim.percent(), Some(0));
        assert!(sim.started_at().is_some());
    }

    #[test]
    fn test_fifty_ticks_complete_stage() {
        let mut sim = ProgressSimulator::default();
        let schedule = sim.start(1, &stage());
        let tick = schedule.tick();

        let mut last = 0;
        for _ in 0..49 {
            match sim.tick(tick) {
                SimulatorStep::Progress { percent, .. } => {
                    assert!(percent > last);
                    last = percent;
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
        assert_eq!(last, 98);
        assert_eq!(sim.tick(tick), SimulatorStep::Complete);
        assert!(!sim.is_running());
        assert_eq!(sim.tick(tick), SimulatorStep::Ignored);
    }

    #[test]
    fn test_increment_never_overshoots() {
        let mut sim = ProgressSimulator::new(30);
        assert_eq!(sim.ticks_per_stage(), 4);
        let tick = sim.start(1, &stage()).tick();

        assert_eq!(
            sim.tick(tick),
            SimulatorStep::Progress { percent: 30, subtask_index: 1 }
        );
        sim.tick(tick);
        assert_eq!(
            sim.tick(tick),
            SimulatorStep::Progress { percent: 90, subtask_index: 3 }
        );
        assert_eq!(sim.tick(tick), SimulatorStep::Complete);
    }

    #[test]
    fn test_stale_and_foreign_ticks_ignored() {
        let mut sim = ProgressSimulator::default();
        sim.start(2, &stage());

        assert_eq!(sim.tick(Tick { generation: 1, stage: 2 }), SimulatorStep::Ignored);
        assert_eq!(sim.tick(Tick { generation: 2, stage: 0 }), SimulatorStep::Ignored);
        assert_eq!(sim.percent(), Some(0));
    }

    #[test]
    fn test_cancel_stops_progress() {
        let mut sim = ProgressSimulator::default();
        let tick = sim.start(1, &stage()).tick();
        sim.tick(tick);
        sim.cancel();

        assert_eq!(sim.tick(tick), SimulatorStep::Ignored);
        assert!(sim.percent().is_none());
    }

    #[test]
    fn test_increment_is_clamped() {
        assert_eq!(ProgressSimulator::new(0).increment(), 1);
        assert_eq!(ProgressSimulator::new(250).increment(), 100);
        assert_eq!(ProgressSimulator::new(100).ticks_per_stage(), 1);
    }
}
