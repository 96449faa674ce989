mod config;
mod cycle;
mod engine;
mod phase;
mod registry;

pub use config::{SessionRecord, SessionSubject, TimerConfig, TimerId, DEFAULT_LONG_BREAK_INTERVAL};
pub use cycle::{PhaseCompletion, PhaseCycle, TickOutcome, TimerSnapshot};
pub use engine::{EngineContext, EngineOptions, TimerEngine};
pub use phase::{minutes_to_secs, PhaseDurations, TimerPhase};
pub use registry::TimerRegistry;
