use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskStatus};
use crate::timer::{TimerId, TimerPhase};

/// Every observable state change in the core produces an Event.
/// Engines and the board publish them through a [`crate::notify::Notifier`];
/// a front-end subscribes instead of being called back directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        timer_id: TimerId,
        timer_name: String,
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Local>,
    },
    TimerStopped {
        timer_id: TimerId,
        timer_name: String,
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Local>,
    },
    TimerReset {
        timer_id: TimerId,
        timer_name: String,
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Local>,
    },
    /// One second elapsed on a running engine.
    TimerTicked {
        timer_id: TimerId,
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Local>,
    },
    /// A phase ran to zero and the engine switched to the next one.
    PhaseCompleted {
        timer_id: TimerId,
        timer_name: String,
        from: TimerPhase,
        to: TimerPhase,
        completed_work_phases: u32,
        at: DateTime<Local>,
    },
    TaskTransitioned {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        at: DateTime<Local>,
    },
    TaskRemoved {
        task_id: TaskId,
        at: DateTime<Local>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Local> {
        match self {
            Event::TimerStarted { at, .. }
            | Event::TimerStopped { at, .. }
            | Event::TimerReset { at, .. }
            | Event::TimerTicked { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::TaskTransitioned { at, .. }
            | Event::TaskRemoved { at, .. } => *at,
        }
    }

    /// The timer this event belongs to, if any.
    pub fn timer_id(&self) -> Option<TimerId> {
        match self {
            Event::TimerStarted { timer_id, .. }
            | Event::TimerStopped { timer_id, .. }
            | Event::TimerReset { timer_id, .. }
            | Event::TimerTicked { timer_id, .. }
            | Event::PhaseCompleted { timer_id, .. } => Some(*timer_id),
            Event::TaskTransitioned { .. } | Event::TaskRemoved { .. } => None,
        }
    }

    /// Ticks are high-volume; sinks such as the log notifier skip them.
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::TimerTicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::PhaseCompleted {
            timer_id: TimerId(3),
            timer_name: "deep work".into(),
            from: TimerPhase::Work,
            to: TimerPhase::LongBreak,
            completed_work_phases: 4,
            at: Local::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_completed");
        assert_eq!(json["from"], "work");
        assert_eq!(json["to"], "long_break");
        assert_eq!(json["timer_id"], 3);
    }

    #[test]
    fn task_events_have_no_timer() {
        let event = Event::TaskRemoved {
            task_id: TaskId(9),
            at: Local::now(),
        };
        assert_eq!(event.timer_id(), None);
        assert!(!event.is_tick());
    }
}
