//! Database schema migrations for pomodesk.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    debug!(current_version, target = SCHEMA_VERSION, "checking schema");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the three base tables.
///
/// Durations are whole seconds, days are `YYYY-MM-DD`, timestamps RFC 3339.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'TODO',
            created_at   TEXT NOT NULL,
            completed_at TEXT,
            priority     INTEGER NOT NULL DEFAULT 1,
            date         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pomodoro_records (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id    INTEGER,
            start_time TEXT NOT NULL,
            end_time   TEXT NOT NULL,
            duration   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timer_configs (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            name                TEXT NOT NULL,
            work_duration       INTEGER NOT NULL,
            break_duration      INTEGER NOT NULL,
            long_break_duration INTEGER NOT NULL,
            date                TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: long-break interval per timer, timer-owned sessions, and
/// the indexes the date-keyed queries rely on.
///
/// Duplicate `(name, date)` timers left by older builds are collapsed to
/// the first one before the unique index is created.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE timer_configs ADD COLUMN long_break_interval INTEGER NOT NULL DEFAULT 4;
         ALTER TABLE pomodoro_records ADD COLUMN timer_id INTEGER;

         DELETE FROM timer_configs
         WHERE id NOT IN (SELECT MIN(id) FROM timer_configs GROUP BY name, date);

         CREATE UNIQUE INDEX IF NOT EXISTS idx_timer_configs_name_date ON timer_configs(name, date);
         CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(date);
         CREATE INDEX IF NOT EXISTS idx_pomodoro_records_start_time ON pomodoro_records(start_time);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        conn.execute(
            "INSERT INTO timer_configs (name, work_duration, break_duration, long_break_duration, date)
             VALUES ('focus', 1500, 300, 900, '2024-06-01')",
            [],
        )
        .unwrap();
        let interval: i64 = conn
            .query_row("SELECT long_break_interval FROM timer_configs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(interval, 4);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration_collapses_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        for _ in 0..2 {
            conn.execute(
                "INSERT INTO timer_configs (name, work_duration, break_duration, long_break_duration, date)
                 VALUES ('focus', 1500, 300, 900, '2024-06-01')",
                [],
            )
            .unwrap();
        }

        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM timer_configs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let dup = conn.execute(
            "INSERT INTO timer_configs (name, work_duration, break_duration, long_break_duration, date)
             VALUES ('focus', 60, 60, 60, '2024-06-01')",
            [],
        );
        assert!(dup.is_err());
    }
}
