mod config;
pub mod database;

pub use config::{AccountConfig, AudioConfig, Config, TimerSection, UiConfig};
pub use database::{Database, StoredSession};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `POMOBOT_DATA_DIR` wins when set. Otherwise `~/.config/pomobot[-dev]/`,
/// where POMOBOT_ENV=dev selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOBOT_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOBOT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomobot-dev")
            } else {
                base_dir.join("pomobot")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
