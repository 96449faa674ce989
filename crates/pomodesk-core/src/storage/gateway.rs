//! The storage contract the timer registry, engines and task board depend on.
//!
//! Everything is keyed by calendar date. Each method is one logical write or
//! read and must be atomic on its own; there are no cross-call transactions.

use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::stats::{DateRange, PomodoroStats, TaskStats};
use crate::task::{Task, TaskId};
use crate::timer::{SessionRecord, TimerConfig, TimerId};

pub type GatewayResult<T> = std::result::Result<T, DatabaseError>;

pub trait PersistenceGateway: Send + Sync {
    /// Insert a new timer configuration and return its identity.
    fn save_timer_config(&self, config: &TimerConfig) -> GatewayResult<TimerId>;

    /// Overwrite durations and interval of the config with the same
    /// `(name, date)`.
    fn update_timer_config(&self, config: &TimerConfig) -> GatewayResult<()>;

    fn delete_timer_config(&self, name: &str, date: NaiveDate) -> GatewayResult<()>;

    fn list_timer_configs(&self, date: NaiveDate) -> GatewayResult<Vec<TimerConfig>>;

    /// Insert when `task.id` is `None`, update otherwise.
    fn save_task(&self, task: &Task) -> GatewayResult<TaskId>;

    fn delete_task(&self, id: TaskId) -> GatewayResult<()>;

    /// Tasks of one day, priority descending then newest first.
    fn list_tasks_by_date(&self, date: NaiveDate) -> GatewayResult<Vec<Task>>;

    fn append_session_record(&self, record: &SessionRecord) -> GatewayResult<i64>;

    /// Every date that has a task or a timer config, newest first.
    fn list_distinct_dates(&self) -> GatewayResult<Vec<NaiveDate>>;

    fn query_task_stats(&self, range: &DateRange) -> GatewayResult<TaskStats>;

    fn query_pomodoro_stats(&self, range: &DateRange) -> GatewayResult<PomodoroStats>;
}
