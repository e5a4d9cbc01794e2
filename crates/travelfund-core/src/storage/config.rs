//! TOML-based application configuration.
//!
//! Holds the rules of the game:
//! - Session length and the pledge/penalty amounts
//! - How many successes earn a spin
//! - The savings target
//! - The reward table used by spins
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::rewards::RewardTable;
use crate::session::DEFAULT_SESSION_SECS;
use crate::spins::DEFAULT_SPIN_THRESHOLD;

/// Longest accepted session: one day.
pub const MAX_SESSION_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Credited to the fund on start, before any record exists.
    #[serde(default = "default_ten")]
    pub pledge_amount: i64,
    /// Charged on top of the returned pledge when a session is abandoned.
    #[serde(default = "default_ten")]
    pub penalty_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinConfig {
    #[serde(default = "default_spin_threshold")]
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundConfig {
    #[serde(default = "default_target")]
    pub target: i64,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub spins: SpinConfig,
    #[serde(default)]
    pub fund: FundConfig,
    #[serde(default)]
    pub rewards: RewardTable,
}

fn default_duration_secs() -> u64 {
    DEFAULT_SESSION_SECS
}
fn default_ten() -> i64 {
    10
}
fn default_spin_threshold() -> u32 {
    DEFAULT_SPIN_THRESHOLD
}
fn default_target() -> i64 {
    5000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            pledge_amount: default_ten(),
            penalty_amount: default_ten(),
        }
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            threshold: default_spin_threshold(),
        }
    }
}

impl Default for FundConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or fails
    /// validation, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
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

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check the values a session needs to be playable. The reward table
    /// validates itself on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.duration_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.duration_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.session.duration_secs > MAX_SESSION_SECS {
            return Err(ConfigError::InvalidValue {
                key: "session.duration_secs".into(),
                message: format!("cannot exceed {MAX_SESSION_SECS} seconds"),
            });
        }
        if self.spins.threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "spins.threshold".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.session.pledge_amount < 0 || self.session.penalty_amount < 0 {
            return Err(ConfigError::InvalidValue {
                key: "session".into(),
                message: "pledge and penalty amounts cannot be negative".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.').filter(|p| !p.is_empty()) {
            current = current.get(part)?;
        }
        if std::ptr::eq(current, &json) {
            return None;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, validate, and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not parse as
    /// the existing value's type, the result is invalid, or saving fails.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Like [`Config::set`] without writing to disk.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
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

    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, parents)) = parts.split_last() else {
        return Err(unknown());
    };
    if leaf.is_empty() {
        return Err(unknown());
    }

    let mut current = root;
    for part in parents {
        current = current.get_mut(*part).ok_or_else(unknown)?;
    }
    let obj = current.as_object_mut().ok_or_else(unknown)?;
    let existing = obj.get(*leaf).ok_or_else(unknown)?;

    let new_value = match existing {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            value
                .parse::<bool>()
                .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
        ),
        serde_json::Value::Number(_) => {
            if let Ok(n) = value.parse::<i64>() {
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
        _ => serde_json::Value::String(value.into()),
    };

    obj.insert(leaf.to_string(), new_value);
    Ok(())
}
