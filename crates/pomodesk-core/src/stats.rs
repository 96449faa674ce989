//! Task and focus-session statistics over a range of days.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::format_date;
use crate::error::ValidationError;
use crate::task::TaskStatus;

/// Inclusive range of calendar days. An open end means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn today(today: NaiveDate) -> Self {
        Self {
            start: Some(today),
            end: Some(today),
        }
    }

    /// Sunday of the current week through today.
    pub fn this_week(today: NaiveDate) -> Self {
        let back = i64::from(today.weekday().num_days_from_sunday());
        Self {
            start: Some(today - Duration::days(back)),
            end: Some(today),
        }
    }

    /// First of the month through today.
    pub fn this_month(today: NaiveDate) -> Self {
        Self {
            start: today.with_day(1),
            end: Some(today),
        }
    }

    pub fn all_time() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Parse `today`, `week`, `month` or `all`.
    pub fn named(name: &str, today: NaiveDate) -> Result<Self, ValidationError> {
        match name {
            "today" => Ok(Self::today(today)),
            "week" => Ok(Self::this_week(today)),
            "month" => Ok(Self::this_month(today)),
            "all" => Ok(Self::all_time()),
            other => Err(ValidationError::InvalidValue {
                field: "range".into(),
                message: format!("expected today, week, month or all, got '{other}'"),
            }),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// `YYYY-MM-DD` bounds for SQL `BETWEEN`, open ends widened.
    pub fn sql_bounds(&self) -> (String, String) {
        (
            self.start.map_or_else(|| "0000-01-01".to_string(), format_date),
            self.end.map_or_else(|| "9999-12-31".to_string(), format_date),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: u64,
    pub done_count: u64,
    pub todo_count: u64,
    pub doing_count: u64,
    pub undo_count: u64,
}

impl TaskStats {
    pub fn add(&mut self, status: TaskStatus) {
        self.add_many(status, 1);
    }

    pub fn add_many(&mut self, status: TaskStatus, n: u64) {
        self.total += n;
        match status {
            TaskStatus::Todo => self.todo_count += n,
            TaskStatus::Doing => self.doing_count += n,
            TaskStatus::Done => self.done_count += n,
            TaskStatus::Undo => self.undo_count += n,
        }
    }

    /// Percentage of tasks done, 0 when there are none.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.done_count as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroStats {
    pub session_count: u64,
    pub total_duration_secs: u64,
    pub today_session_count: u64,
    pub today_duration_secs: u64,
}

impl PomodoroStats {
    pub fn average_duration_secs(&self) -> f64 {
        if self.session_count == 0 {
            return 0.0;
        }
        self.total_duration_secs as f64 / self.session_count as f64
    }
}

/// Both kinds of statistics plus the derived figures, as shown to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub range: DateRange,
    pub tasks: TaskStats,
    pub completion_rate_pct: f64,
    pub pomodoros: PomodoroStats,
    pub average_session_secs: f64,
}

impl StatsReport {
    pub fn new(range: DateRange, tasks: TaskStats, pomodoros: PomodoroStats) -> Self {
        Self {
            range,
            completion_rate_pct: tasks.completion_rate(),
            average_session_secs: pomodoros.average_duration_secs(),
            tasks,
            pomodoros,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-06-05 is a Wednesday.
        let range = DateRange::this_week(d(2024, 6, 5));
        assert_eq!(range.start, Some(d(2024, 6, 2)));
        assert!(range.contains(d(2024, 6, 3)));
        assert!(!range.contains(d(2024, 6, 1)));
    }

    #[test]
    fn month_starts_on_first() {
        let range = DateRange::this_month(d(2024, 2, 29));
        assert_eq!(range.start, Some(d(2024, 2, 1)));
        assert_eq!(range.sql_bounds(), ("2024-02-01".into(), "2024-02-29".into()));
    }

    #[test]
    fn all_time_is_unbounded() {
        let range = DateRange::all_time();
        assert!(range.contains(d(1970, 1, 1)));
        assert_eq!(range.sql_bounds().0, "0000-01-01");
    }

    #[test]
    fn between_rejects_reversed() {
        assert!(DateRange::between(d(2024, 1, 2), d(2024, 1, 1)).is_err());
        assert!(DateRange::named("year", d(2024, 1, 1)).is_err());
    }

    #[test]
    fn derived_figures() {
        let mut tasks = TaskStats::default();
        tasks.add(TaskStatus::Done);
        tasks.add(TaskStatus::Todo);
        tasks.add(TaskStatus::Done);
        tasks.add(TaskStatus::Undo);
        assert_eq!(tasks.completion_rate(), 50.0);
        assert_eq!(TaskStats::default().completion_rate(), 0.0);

        let p = PomodoroStats {
            session_count: 4,
            total_duration_secs: 6000,
            ..Default::default()
        };
        assert_eq!(p.average_duration_secs(), 1500.0);
    }
}
