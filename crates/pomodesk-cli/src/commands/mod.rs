pub mod config;
pub mod dates;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use chrono::NaiveDate;
use pomodesk_core::clock::parse_date;
use pomodesk_core::{data_dir, Clock, Config, Database, SystemClock};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Config plus the database it names, opened from the data directory.
pub struct Workspace {
    pub config: Config,
    pub db: Arc<Database>,
    pub clock: Arc<SystemClock>,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let path = data_dir()?.join(&config.database.file_name);
        let db = Database::open_at(path)?;
        Ok(Self {
            config,
            db: Arc::new(db),
            clock: Arc::new(SystemClock),
        })
    }

    /// The given day, or today.
    pub fn day(&self, date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(|| self.clock.today())
    }
}

/// clap value parser for `YYYY-MM-DD`.
pub fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
