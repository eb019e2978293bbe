mod config;

pub use config::{AlertConfig, Config, DurationsConfig, CYCLE_CHOICES, DURATION_CHOICES_MIN};

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns `~/.config/don-tomate[-dev]/` based on TOMATE_ENV.
///
/// Set TOMATE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TOMATE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("don-tomate-dev")
    } else {
        base_dir.join("don-tomate")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
