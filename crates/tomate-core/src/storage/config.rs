//! TOML-based application configuration.
//!
//! Stores the settings panel's choices:
//! - Number of pomodoros per cycle
//! - Default durations per slot kind (minutes)
//! - Per-slot duration overrides (seconds)
//! - Alert sound preferences
//!
//! Configuration is stored at `~/.config/don-tomate/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::timer::SlotDurations;

/// Cycle counts offered by the settings panel.
pub const CYCLE_CHOICES: std::ops::RangeInclusive<u32> = 1..=6;
/// Slot lengths offered by the settings panel, in minutes.
pub const DURATION_CHOICES_MIN: [u64; 6] = [5, 10, 15, 20, 25, 30];

/// Default slot lengths, in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_pomodoro")]
    pub pomodoro: u64,
    #[serde(default = "default_short_break")]
    pub short_break: u64,
    #[serde(default = "default_long_break")]
    pub long_break: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Resource id handed to the audio backend.
    #[serde(default = "default_sound")]
    pub sound: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/don-tomate/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_cycle_count")]
    pub cycle_count: u32,
    #[serde(default)]
    pub durations: DurationsConfig,
    /// Slot id -> seconds. Applied after each build for slots that exist.
    #[serde(default)]
    pub overrides: HashMap<String, u64>,
    #[serde(default)]
    pub alert: AlertConfig,
}

// Default functions
fn default_cycle_count() -> u32 {
    4
}
fn default_pomodoro() -> u64 {
    25
}
fn default_short_break() -> u64 {
    5
}
fn default_long_break() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_sound() -> String {
    crate::timer::DEFAULT_ALERT_RESOURCE.into()
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            pomodoro: default_pomodoro(),
            short_break: default_short_break(),
            long_break: default_long_break(),
        }
    }
}

impl DurationsConfig {
    pub fn to_slot_durations(&self) -> SlotDurations {
        SlotDurations {
            pomodoro: self.pomodoro.saturating_mul(60),
            short_break: self.short_break.saturating_mul(60),
            long_break: self.long_break.saturating_mul(60),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: default_sound(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_count: default_cycle_count(),
            durations: DurationsConfig::default(),
            overrides: HashMap::new(),
            alert: AlertConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        let mut parent = "";
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                // Overrides is an open table: new slot ids may be added.
                let new_value = match obj.get(part) {
                    None if parent == "overrides" => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    None => return Err(unknown()),
                    Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    Some(serde_json::Value::Number(_)) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    Some(serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    Some(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
            parent = part;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::load`], for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::save`], for an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory by dot-separated key. The result must pass
    /// [`Config::validate`]; on error `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.update(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// `InvalidCycleCount` or `InvalidDuration` for zero values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_count < 1 {
            return Err(ConfigError::InvalidCycleCount(self.cycle_count));
        }
        let d = &self.durations;
        for (slot, minutes) in [
            ("durations.pomodoro", d.pomodoro),
            ("durations.short_break", d.short_break),
            ("durations.long_break", d.long_break),
        ] {
            if minutes == 0 {
                return Err(ConfigError::InvalidDuration {
                    slot: slot.into(),
                    seconds: 0,
                });
            }
        }
        if let Some((slot, _)) = self.overrides.iter().find(|&(_, &secs)| secs == 0) {
            return Err(ConfigError::InvalidDuration {
                slot: slot.clone(),
                seconds: 0,
            });
        }
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
