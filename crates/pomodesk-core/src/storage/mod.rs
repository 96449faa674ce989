mod config;
pub mod database;
pub mod gateway;
pub mod migrations;

pub use config::{Config, DatabaseConfig, NotificationsConfig, PomodoroConfig};
pub use database::{Database, DEFAULT_DB_FILE};
pub use gateway::{GatewayResult, PersistenceGateway};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding the database and `config.toml`.
///
/// `POMODESK_DATA_DIR` wins when set. Otherwise `~/.config/pomodesk/`, or
/// `~/.config/pomodesk-dev/` when `POMODESK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMODESK_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMODESK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pomodesk-dev")
            } else {
                base_dir.join("pomodesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
