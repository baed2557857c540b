pub mod config;
pub mod database;

pub use config::{Config, DetectionConfig, LearningConfig, LedgerConfig, SchedulerIntervals};
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/timekeeper[-dev]/` based on TIMEKEEPER_ENV.
///
/// Set TIMEKEEPER_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEKEEPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timekeeper-dev")
    } else {
        base_dir.join("timekeeper")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
