//! Persisted timer parameters and completed-session records.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::phase::PhaseDurations;
use crate::error::{CoreError, Result, ValidationError};
use crate::task::TaskId;

/// Default number of work phases between long breaks.
pub const DEFAULT_LONG_BREAK_INTERVAL: u32 = 4;

/// Store-assigned timer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub i64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static parameters of one named timer on one day.
///
/// The natural key is `(name, date)`; `id` is filled in once saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub id: Option<TimerId>,
    pub name: String,
    pub durations: PhaseDurations,
    pub long_break_interval: u32,
    pub date: NaiveDate,
}

impl TimerConfig {
    pub fn new(
        name: impl Into<String>,
        durations: PhaseDurations,
        long_break_interval: u32,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            durations,
            long_break_interval,
            date,
        }
    }

    /// Check everything an engine needs before it can be built.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty("timer name".into()).into());
        }
        self.durations.validate()?;
        if self.long_break_interval < 1 {
            return Err(CoreError::InvalidConfiguration(
                "long break interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// What a completed work session is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SessionSubject {
    Timer(TimerId),
    Task(TaskId),
}

/// One completed work phase. Inserted once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Option<i64>,
    pub subject: SessionSubject,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub duration_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn zero_interval_is_invalid() {
        let cfg = TimerConfig::new("focus", PhaseDurations::default(), 0, day());
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn blank_name_is_invalid() {
        let cfg = TimerConfig::new("  ", PhaseDurations::default(), 4, day());
        assert!(matches!(cfg.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn subject_serializes_tagged() {
        let json = serde_json::to_value(SessionSubject::Timer(TimerId(7))).unwrap();
        assert_eq!(json["kind"], "timer");
        assert_eq!(json["id"], 7);
    }
}
