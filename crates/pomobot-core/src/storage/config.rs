//! TOML-based application configuration.
//!
//! Stores local settings:
//! - Work and break durations
//! - Cue sound (enabled, melody, volume)
//! - Dark/light theme flag (kept locally, independent of any account)
//! - The signed-in user id, if any
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::audio::ToneSpec;
use crate::error::ConfigError;
use crate::persistence::UserId;
use crate::timer::{TimerConfig, DEFAULT_BREAK_MIN, DEFAULT_WORK_MIN};

/// Durations in minutes. Clamped into `[1, 60]` when turned into a
/// [`TimerConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSection {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_break_duration")]
    pub break_duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_frequencies")]
    pub frequencies: Vec<f32>,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSection,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub account: AccountConfig,
}

fn default_work_duration() -> u32 {
    DEFAULT_WORK_MIN
}
fn default_break_duration() -> u32 {
    DEFAULT_BREAK_MIN
}
fn default_true() -> bool {
    true
}
fn default_frequencies() -> Vec<f32> {
    ToneSpec::default().frequencies_hz().to_vec()
}
fn default_volume() -> f32 {
    ToneSpec::default().peak_volume()
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            break_duration: default_break_duration(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequencies: default_frequencies(),
            volume: default_volume(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { dark_mode: true }
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional strings are `null` until first set.
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
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

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Durations clamped into the accepted range.
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::new(self.timer.work_duration, self.timer.break_duration)
    }

    /// The configured melody, or the default one if the stored values are
    /// unusable.
    pub fn tone_spec(&self) -> ToneSpec {
        ToneSpec::new(self.audio.frequencies.clone(), self.audio.volume).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid cue settings, using default melody");
            ToneSpec::default()
        })
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.account
            .user_id
            .as_deref()
            .and_then(|id| UserId::new(id).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert!(parsed.ui.dark_mode);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_duration = 50\n").unwrap();
        assert_eq!(parsed.timer.work_duration, 50);
        assert_eq!(parsed.timer.break_duration, 5);
        assert!(parsed.audio.enabled);
        assert!(parsed.account.user_id.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("ui.dark_mode").as_deref(), Some("true"));
        assert_eq!(cfg.get("timer.work_duration").as_deref(), Some("25"));
        assert!(cfg.get("ui.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("ui.dark_mode", "false").unwrap();
        cfg.set("timer.break_duration", "10").unwrap();
        cfg.set("audio.frequencies", "[440, 660]").unwrap();
        cfg.set("account.user_id", "ana").unwrap();
        assert!(!cfg.ui.dark_mode);
        assert_eq!(cfg.timer.break_duration, 10);
        assert_eq!(cfg.audio.frequencies, vec![440.0, 660.0]);
        assert_eq!(cfg.user_id().unwrap().as_str(), "ana");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("ui.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("ui.dark_mode", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("timer.work_duration", "-3").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn out_of_range_values_are_clamped_on_use() {
        let mut cfg = Config::default();
        cfg.timer.work_duration = 0;
        cfg.timer.break_duration = 90;
        let timer = cfg.timer_config();
        assert_eq!(timer.work_duration_min(), 1);
        assert_eq!(timer.break_duration_min(), 60);
    }

    #[test]
    fn invalid_melody_falls_back() {
        let mut cfg = Config::default();
        cfg.audio.volume = 3.0;
        assert_eq!(cfg.tone_spec(), ToneSpec::default());
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.ui.dark_mode = false;
        changed.save_to(&path).unwrap();
        assert!(!Config::load_from(&path).unwrap().ui.dark_mode);
    }
}
