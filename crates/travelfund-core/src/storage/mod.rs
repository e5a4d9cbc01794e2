mod config;
pub mod database;

pub use config::{Config, FundConfig, SessionConfig, SpinConfig};
pub use database::Database;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StoreError;

/// Opaque string key-value store holding the persisted snapshot.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Overwrite `key` with `value`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store. Contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns the data directory, creating it if needed.
///
/// `TRAVELFUND_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/travelfund[-dev]/`, with `-dev` selected by `TRAVELFUND_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = match std::env::var_os("TRAVELFUND_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TRAVELFUND_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("travelfund-dev")
            } else {
                base_dir.join("travelfund")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
