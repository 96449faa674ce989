//! Phase state machine for one focus timer.
//!
//! `PhaseCycle` has no threads and no clock of its own: the caller passes the
//! current time into every command and calls `tick()` once per elapsed
//! second. [`super::TimerEngine`] drives it from a background task.
//!
//! ## Phase transitions
//!
//! ```text
//! Work --(n-th completion, n % interval != 0)--> ShortBreak --> Work
//! Work --(n-th completion, n % interval == 0)--> LongBreak  --> Work
//! ```
//!
//! `start`/`stop` toggle `running` within a phase; `complete_phase` switches
//! phase and resets the remaining time in one step.
//!
//! ## Usage
//!
//! ```ignore
//! let mut cycle = PhaseCycle::new(id, &config, true)?;
//! cycle.start(Local::now());
//! // once per second:
//! let outcome = cycle.tick(Local::now());
//! ```

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::config::{SessionRecord, SessionSubject, TimerConfig, TimerId};
use super::phase::{PhaseDurations, TimerPhase};
use crate::clock::TICK;
use crate::error::{CoreError, Result};
use crate::events::Event;

/// Read-only view of a timer for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub id: TimerId,
    pub name: String,
    pub phase: TimerPhase,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub running: bool,
    pub completed_work_phases: u32,
    pub long_break_interval: u32,
}

/// Everything one tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub events: Vec<Event>,
    /// Present when the tick finished a work phase.
    pub session: Option<SessionRecord>,
}

impl TickOutcome {
    pub fn completed_phase(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::PhaseCompleted { .. }))
    }
}

/// Result of finishing the current phase.
#[derive(Debug)]
pub struct PhaseCompletion {
    pub event: Event,
    pub session: Option<SessionRecord>,
}

#[derive(Debug, Clone)]
pub struct PhaseCycle {
    id: TimerId,
    name: String,
    durations: PhaseDurations,
    long_break_interval: u32,
    auto_continue: bool,
    phase: TimerPhase,
    remaining: Duration,
    running: bool,
    completed_work_phases: u32,
    /// When the current work phase first started counting.
    work_started_at: Option<DateTime<Local>>,
}

impl PhaseCycle {
    /// Build an idle cycle at the start of a work phase.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a zero duration or an interval below 1;
    /// nothing is constructed in that case.
    pub fn new(id: TimerId, config: &TimerConfig, auto_continue: bool) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            name: config.name.clone(),
            durations: config.durations,
            long_break_interval: config.long_break_interval,
            auto_continue,
            phase: TimerPhase::Work,
            remaining: config.durations.work,
            running: false,
            completed_work_phases: 0,
            work_started_at: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work_phases(&self) -> u32 {
        self.completed_work_phases
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    pub fn long_break_interval(&self) -> u32 {
        self.long_break_interval
    }

    pub fn auto_continue(&self) -> bool {
        self.auto_continue
    }

    /// Full length of the current phase.
    pub fn total(&self) -> Duration {
        self.durations.get(self.phase)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.total().as_secs_f64();
        if total == 0.0 {
            return 0.0;
        }
        1.0 - self.remaining.as_secs_f64() / total
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            id: self.id,
            name: self.name.clone(),
            phase: self.phase,
            remaining_secs: self.remaining.as_secs(),
            total_secs: self.total().as_secs(),
            running: self.running,
            completed_work_phases: self.completed_work_phases,
            long_break_interval: self.long_break_interval,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// No-op when already running or when nothing is left to count down.
    pub fn start(&mut self, now: DateTime<Local>) -> Option<Event> {
        if self.running || self.remaining.is_zero() {
            return None;
        }
        self.running = true;
        if self.phase == TimerPhase::Work && self.work_started_at.is_none() {
            self.work_started_at = Some(now);
        }
        Some(Event::TimerStarted {
            timer_id: self.id,
            timer_name: self.name.clone(),
            phase: self.phase,
            remaining_secs: self.remaining.as_secs(),
            at: now,
        })
    }

    pub fn stop(&mut self, now: DateTime<Local>) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Event::TimerStopped {
            timer_id: self.id,
            timer_name: self.name.clone(),
            phase: self.phase,
            remaining_secs: self.remaining.as_secs(),
            at: now,
        })
    }

    /// Stop and refill the current phase. The phase itself is kept.
    pub fn reset(&mut self, now: DateTime<Local>) -> Event {
        self.running = false;
        self.remaining = self.total();
        self.work_started_at = None;
        Event::TimerReset {
            timer_id: self.id,
            timer_name: self.name.clone(),
            phase: self.phase,
            remaining_secs: self.remaining.as_secs(),
            at: now,
        }
    }

    /// One second elapsed. Does nothing unless running.
    pub fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.running {
            return outcome;
        }
        self.remaining = self.remaining.saturating_sub(TICK);
        outcome.events.push(Event::TimerTicked {
            timer_id: self.id,
            phase: self.phase,
            remaining_secs: self.remaining.as_secs(),
            at: now,
        });
        if self.remaining.is_zero() {
            let completion = self.complete_phase(now);
            outcome.events.push(completion.event);
            outcome.session = completion.session;
        }
        outcome
    }

    /// Finish the current phase and move to the next one.
    ///
    /// A finished work phase bumps the completed counter and yields a
    /// session record. With auto-continue the cycle keeps running into the
    /// next phase; otherwise it stops there.
    pub fn complete_phase(&mut self, now: DateTime<Local>) -> PhaseCompletion {
        let from = self.phase;
        let mut session = None;

        let next = if from == TimerPhase::Work {
            self.completed_work_phases += 1;
            let work = self.durations.work;
            let started_at = self.work_started_at.take().unwrap_or_else(|| {
                now - chrono::Duration::from_std(work).unwrap_or_else(|_| chrono::Duration::zero())
            });
            session = Some(SessionRecord {
                id: None,
                subject: SessionSubject::Timer(self.id),
                started_at,
                ended_at: now,
                duration_secs: work.as_secs(),
            });
            if self.completed_work_phases % self.long_break_interval == 0 {
                TimerPhase::LongBreak
            } else {
                TimerPhase::ShortBreak
            }
        } else {
            TimerPhase::Work
        };

        self.phase = next;
        self.remaining = self.durations.get(next);
        self.running = self.running && self.auto_continue;
        if next == TimerPhase::Work && self.running {
            self.work_started_at = Some(now);
        }

        PhaseCompletion {
            event: Event::PhaseCompleted {
                timer_id: self.id,
                timer_name: self.name.clone(),
                from,
                to: next,
                completed_work_phases: self.completed_work_phases,
                at: now,
            },
            session,
        }
    }

    /// Swap in new parameters. Stops the cycle and restarts it at the
    /// beginning of a work phase; the completed-phase count is kept.
    pub fn reconfigure(
        &mut self,
        durations: PhaseDurations,
        long_break_interval: u32,
        now: DateTime<Local>,
    ) -> Result<Event> {
        durations.validate()?;
        if long_break_interval < 1 {
            return Err(CoreError::InvalidConfiguration(
                "long break interval must be at least 1".into(),
            ));
        }
        self.durations = durations;
        self.long_break_interval = long_break_interval;
        self.phase = TimerPhase::Work;
        Ok(self.reset(now))
    }

    pub fn set_auto_continue(&mut self, auto_continue: bool) {
        self.auto_continue = auto_continue;
    }
}
