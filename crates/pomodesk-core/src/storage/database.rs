//! SQLite-backed persistence gateway.
//!
//! Stores per-day timer configurations, tasks and completed work sessions,
//! and answers the statistics queries. One connection behind a mutex: every
//! gateway call is a single statement or a single transaction.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::gateway::{GatewayResult, PersistenceGateway};
use super::{data_dir, migrations};
use crate::clock::{format_date, parse_date, Clock, SystemClock};
use crate::error::{DatabaseError, Result};
use crate::stats::{DateRange, PomodoroStats, TaskStats};
use crate::task::{Task, TaskId, TaskStatus};
use crate::timer::{PhaseDurations, SessionRecord, SessionSubject, TimerConfig, TimerId};

/// File name used when none is configured.
pub const DEFAULT_DB_FILE: &str = "pomodesk.db";

/// SQLite database implementing [`PersistenceGateway`].
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open the database at `<data_dir>/pomodesk.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be resolved or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join(DEFAULT_DB_FILE);
        Ok(Self::open_at(path)?)
    }

    pub fn open_at(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "opened database");
        Self::from_connection(conn, Some(path))
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_in_memory() -> GatewayResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> GatewayResult<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to decide what "today" means in statistics.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> GatewayResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::QueryFailed("connection mutex poisoned".into()))
    }
}

// ── Row decoding ────────────────────────────────────────────────────

fn corrupt(column: &str, value: impl Into<String>) -> DatabaseError {
    DatabaseError::Corrupt {
        column: column.to_string(),
        value: value.into(),
    }
}

fn decode_date(column: &str, raw: &str) -> GatewayResult<NaiveDate> {
    parse_date(raw).map_err(|_| corrupt(column, raw))
}

fn decode_time(column: &str, raw: &str) -> GatewayResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Local))
        .map_err(|_| corrupt(column, raw))
}

fn encode_secs(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

fn decode_secs(column: &str, raw: i64) -> GatewayResult<u64> {
    u64::try_from(raw).map_err(|_| corrupt(column, raw.to_string()))
}

struct TimerRow {
    id: i64,
    name: String,
    work: i64,
    short_break: i64,
    long_break: i64,
    interval: i64,
    date: String,
}

impl TimerRow {
    fn decode(self) -> GatewayResult<TimerConfig> {
        let durations = PhaseDurations::from_secs(
            decode_secs("work_duration", self.work)?,
            decode_secs("break_duration", self.short_break)?,
            decode_secs("long_break_duration", self.long_break)?,
        )
        .map_err(|e| corrupt("timer_configs", e.to_string()))?;
        let interval = u32::try_from(self.interval)
            .map_err(|_| corrupt("long_break_interval", self.interval.to_string()))?;
        let mut config = TimerConfig::new(
            self.name,
            durations,
            interval,
            decode_date("date", &self.date)?,
        );
        config.id = Some(TimerId(self.id));
        Ok(config)
    }
}

struct TaskRow {
    id: i64,
    title: String,
    description: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    priority: i32,
    date: String,
}

impl TaskRow {
    fn decode(self) -> GatewayResult<Task> {
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|_| corrupt("status", self.status.as_str()))?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| decode_time("completed_at", raw))
            .transpose()?;
        Ok(Task {
            id: Some(TaskId(self.id)),
            title: self.title,
            description: self.description,
            status,
            created_at: decode_time("created_at", &self.created_at)?,
            completed_at,
            priority: self.priority,
            date: decode_date("date", &self.date)?,
        })
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

impl PersistenceGateway for Database {
    fn save_timer_config(&self, config: &TimerConfig) -> GatewayResult<TimerId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO timer_configs
                (name, work_duration, break_duration, long_break_duration, long_break_interval, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                config.name,
                encode_secs(config.durations.work),
                encode_secs(config.durations.short_break),
                encode_secs(config.durations.long_break),
                config.long_break_interval,
                format_date(config.date),
            ],
        )?;
        let id = TimerId(conn.last_insert_rowid());
        debug!(%id, name = %config.name, date = %config.date, "saved timer config");
        Ok(id)
    }

    fn update_timer_config(&self, config: &TimerConfig) -> GatewayResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE timer_configs
             SET work_duration = ?1, break_duration = ?2, long_break_duration = ?3,
                 long_break_interval = ?4
             WHERE name = ?5 AND date = ?6",
            params![
                encode_secs(config.durations.work),
                encode_secs(config.durations.short_break),
                encode_secs(config.durations.long_break),
                config.long_break_interval,
                config.name,
                format_date(config.date),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::Missing(format!(
                "timer '{}' on {}",
                config.name, config.date
            )));
        }
        Ok(())
    }

    fn delete_timer_config(&self, name: &str, date: NaiveDate) -> GatewayResult<()> {
        self.conn()?.execute(
            "DELETE FROM timer_configs WHERE name = ?1 AND date = ?2",
            params![name, format_date(date)],
        )?;
        Ok(())
    }

    fn list_timer_configs(&self, date: NaiveDate) -> GatewayResult<Vec<TimerConfig>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, work_duration, break_duration, long_break_duration,
                    long_break_interval, date
             FROM timer_configs
             WHERE date = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![format_date(date)], |row| {
            Ok(TimerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                work: row.get(2)?,
                short_break: row.get(3)?,
                long_break: row.get(4)?,
                interval: row.get(5)?,
                date: row.get(6)?,
            })
        })?;
        let configs = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(TimerRow::decode))
            .collect::<GatewayResult<Vec<_>>>();
        configs
    }

    fn save_task(&self, task: &Task) -> GatewayResult<TaskId> {
        let conn = self.conn()?;
        let completed_at = task.completed_at.map(|t| t.to_rfc3339());
        match task.id {
            None => {
                conn.execute(
                    "INSERT INTO tasks
                        (title, description, status, created_at, completed_at, priority, date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        task.title,
                        task.description,
                        task.status.as_str(),
                        task.created_at.to_rfc3339(),
                        completed_at,
                        task.priority,
                        format_date(task.date),
                    ],
                )?;
                Ok(TaskId(conn.last_insert_rowid()))
            }
            Some(id) => {
                let changed = conn.execute(
                    "UPDATE tasks
                     SET title = ?1, description = ?2, status = ?3, completed_at = ?4,
                         priority = ?5
                     WHERE id = ?6",
                    params![
                        task.title,
                        task.description,
                        task.status.as_str(),
                        completed_at,
                        task.priority,
                        id.0,
                    ],
                )?;
                if changed == 0 {
                    return Err(DatabaseError::Missing(format!("task {id}")));
                }
                Ok(id)
            }
        }
    }

    fn delete_task(&self, id: TaskId) -> GatewayResult<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.0])?;
        if changed == 0 {
            return Err(DatabaseError::Missing(format!("task {id}")));
        }
        Ok(())
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> GatewayResult<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, created_at, completed_at, priority, date
             FROM tasks
             WHERE date = ?1
             ORDER BY priority DESC, created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![format_date(date)], |row| {
            Ok(TaskRow {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                status: row.get(3)?,
                created_at: row.get(4)?,
                completed_at: row.get(5)?,
                priority: row.get(6)?,
                date: row.get(7)?,
            })
        })?;
        let tasks = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(TaskRow::decode))
            .collect::<GatewayResult<Vec<_>>>();
        tasks
    }

    fn append_session_record(&self, record: &SessionRecord) -> GatewayResult<i64> {
        let (timer_id, task_id) = match record.subject {
            SessionSubject::Timer(id) => (Some(id.0), None),
            SessionSubject::Task(id) => (None, Some(id.0)),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pomodoro_records (timer_id, task_id, start_time, end_time, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                timer_id,
                task_id,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                i64::try_from(record.duration_secs).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_distinct_dates(&self) -> GatewayResult<Vec<NaiveDate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT date FROM tasks
             UNION
             SELECT date FROM timer_configs
             ORDER BY date DESC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let dates = rows
            .map(|row| {
                let raw = row?;
                decode_date("date", &raw)
            })
            .collect::<GatewayResult<Vec<_>>>();
        dates
    }

    fn query_task_stats(&self, range: &DateRange) -> GatewayResult<TaskStats> {
        let (start, end) = range.sql_bounds();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*)
             FROM tasks
             WHERE date BETWEEN ?1 AND ?2
             GROUP BY status",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut stats = TaskStats::default();
        for row in rows {
            let (raw, count) = row?;
            let status: TaskStatus = raw.parse().map_err(|_| corrupt("status", raw.as_str()))?;
            stats.add_many(status, decode_secs("count", count)?);
        }
        Ok(stats)
    }

    fn query_pomodoro_stats(&self, range: &DateRange) -> GatewayResult<PomodoroStats> {
        let (start, end) = range.sql_bounds();
        let today = format_date(self.clock.today());
        let conn = self.conn()?;

        let sum_between = |from: &str, to: &str| -> GatewayResult<(i64, i64)> {
            let row = conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(duration), 0)
                     FROM pomodoro_records
                     WHERE substr(start_time, 1, 10) BETWEEN ?1 AND ?2",
                    params![from, to],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            Ok(row.unwrap_or((0, 0)))
        };

        let (count, total) = sum_between(&start, &end)?;
        let (today_count, today_total) = sum_between(&today, &today)?;
        Ok(PomodoroStats {
            session_count: decode_secs("count", count)?,
            total_duration_secs: decode_secs("duration", total)?,
            today_session_count: decode_secs("count", today_count)?,
            today_duration_secs: decode_secs("duration", today_total)?,
        })
    }
}
