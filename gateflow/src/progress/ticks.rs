//! Tick sources feeding the progress simulator.
//!
//! A tick source follows one [`TickSchedule`] at a time. Every tick it yields
//! is tagged with the run generation and stage ordinal of that schedule so the
//! consumer can drop ticks belonging to a discarded run or a finished stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::trace;

/// A single progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tick {
    /// Run generation the tick belongs to.
    pub generation: u64,
    /// Ordinal of the stage the tick was scheduled for.
    pub stage: usize,
}

/// Recurring tick schedule for one active stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    /// Run generation.
    pub generation: u64,
    /// Ordinal of the active stage.
    pub stage: usize,
    /// Pacing between ticks.
    pub interval: Duration,
}

impl TickSchedule {
    /// Returns the tick this schedule produces.
    #[must_use]
    pub fn tick(&self) -> Tick {
        Tick {
            generation: self.generation,
            stage: self.stage,
        }
    }
}

/// Source of discrete, ordered progress ticks.
#[async_trait]
pub trait TickSource: Send {
    /// Arms the source for a new schedule, replacing any previous one.
    fn schedule(&mut self, schedule: TickSchedule);

    /// Stops producing ticks until the next `schedule` call.
    fn cancel(&mut self);

    /// Waits for the next tick. Returns `None` when nothing is scheduled.
    async fn next_tick(&mut self) -> Option<Tick>;
}

/// Deterministic tick source that yields immediately.
///
/// Intended for tests and for driving a run synchronously without
/// wall-clock waits.
#[derive(Debug, Default)]
pub struct ManualTickSource {
    armed: Option<TickSchedule>,
    emitted: u64,
}

impl ManualTickSource {
    /// Creates an unarmed source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the next tick without awaiting.
    pub fn pulse(&mut self) -> Option<Tick> {
        let tick = self.armed.map(|schedule| schedule.tick())?;
        self.emitted += 1;
        Some(tick)
    }

    /// Returns the schedule currently followed.
    #[must_use]
    pub fn current(&self) -> Option<TickSchedule> {
        self.armed
    }

    /// Returns the number of ticks produced so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[async_trait]
impl TickSource for ManualTickSource {
    fn schedule(&mut self, schedule: TickSchedule) {
        self.armed = Some(schedule);
    }

    fn cancel(&mut self) {
        self.armed = None;
    }

    async fn next_tick(&mut self) -> Option<Tick> {
        self.pulse()
    }
}

/// Wall-clock tick source backed by `tokio::time::interval`.
#[derive(Debug, Default)]
pub struct IntervalTickSource {
    armed: Option<TickSchedule>,
    timer: Option<Interval>,
}

impl IntervalTickSource {
    /// Creates an unarmed source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TickSource for IntervalTickSource {
    fn schedule(&mut self, schedule: TickSchedule) {
        self.armed = Some(schedule);
        // Built lazily in `next_tick` so scheduling works outside a runtime.
        self.timer = None;
    }

    fn cancel(&mut self) {
        self.armed = None;
        self.timer = None;
    }

    async fn next_tick(&mut self) -> Option<Tick> {
        let schedule = self.armed?;
        let period = schedule.interval.max(Duration::from_millis(1));

        let timer = self.timer.get_or_insert_with(|| {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });
        timer.tick().await;

        trace!(generation = schedule.generation, stage = schedule.stage, "tick");
        Some(schedule.tick())
    }
}
