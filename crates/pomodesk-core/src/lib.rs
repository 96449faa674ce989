//! # Pomodesk Core Library
//!
//! Core logic for the Pomodesk multi-timer pomodoro desk: any number of
//! named countdown timers per day, a day-partitioned task board, and the
//! SQLite store both of them write through. The `pomodesk` CLI is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: [`PhaseCycle`] is the pure work/short-break/long-break state
//!   machine; [`TimerEngine`] drives one cycle from a tokio task, one tick per
//!   second; [`TimerRegistry`] owns the engines of the selected day
//! - **Tasks**: [`TaskBoard`] holds one day's tasks and enforces the
//!   TODO/DOING/DONE/UNDO workflow
//! - **Storage**: [`PersistenceGateway`] is the date-keyed storage contract,
//!   [`Database`] its SQLite implementation; [`Config`] is the TOML settings
//! - **Notifications**: every state change is an [`Event`] handed to a
//!   [`Notifier`]
//!
//! ## Key Components
//!
//! - [`TimerRegistry`]: create, update, delete and run timers for a day
//! - [`TaskBoard`]: add, move, rename and remove tasks for a day
//! - [`Database`]: timers, tasks, session records and statistics
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use notify::{
    BellNotifier, ChannelNotifier, FanoutNotifier, LogNotifier, Notifier, NotifyError,
    NullNotifier,
};
pub use stats::{DateRange, PomodoroStats, StatsReport, TaskStats};
pub use storage::{data_dir, Config, Database, PersistenceGateway};
pub use task::{Discarded, Task, TaskBoard, TaskId, TaskStatus};
pub use timer::{
    minutes_to_secs, EngineContext, EngineOptions, PhaseCycle, PhaseDurations, SessionRecord,
    SessionSubject, TimerConfig, TimerEngine, TimerId, TimerPhase, TimerRegistry, TimerSnapshot,
};
