//! Faucet settings.
//!
//! Loaded from a TOML file, then patched from `DRIP_*` environment
//! variables. Every section has defaults, so an empty file is valid.

use crate::engine::Faucet;
use crate::events::{EventLog, DEFAULT_EVENT_CHANNEL_CAPACITY};
use crate::ledger::TokenLedger;
use drip_storage::{MemoryRecordStore, RecordStore, SledRecordStore};
use drip_types::{Address, Clock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ENV_PROGRAM_ID: &str = "DRIP_PROGRAM_ID";
pub const ENV_STORAGE_BACKEND: &str = "DRIP_STORAGE_BACKEND";
pub const ENV_STORAGE_PATH: &str = "DRIP_STORAGE_PATH";
pub const ENV_EVENT_CAPACITY: &str = "DRIP_EVENT_CAPACITY";
pub const ENV_KEEPER_POLL_SECS: &str = "DRIP_KEEPER_POLL_SECS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },

    #[error("failed to open record store: {0}")]
    Storage(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Database directory, used by the sled backend only
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("./data/faucet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperSettings {
    pub poll_period_secs: u64,
}

impl KeeperSettings {
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs.max(1))
    }
}

impl Default for KeeperSettings {
    fn default() -> Self {
        Self {
            poll_period_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetSettings {
    /// Identity all derived addresses are scoped to
    pub program_id: Address,
    pub storage: StorageSettings,
    pub events: EventSettings,
    pub keeper: KeeperSettings,
}

impl FaucetSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path` and apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&text)?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(std::env::vars())
    }

    /// Apply `DRIP_*` overrides from `(key, value)` pairs; other keys are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let invalid = || SettingsError::InvalidOverride {
                key: key.clone(),
                value: value.clone(),
            };
            match key.as_str() {
                ENV_PROGRAM_ID => self.program_id = value.parse().map_err(|_| invalid())?,
                ENV_STORAGE_BACKEND => {
                    self.storage.backend = match value.to_lowercase().as_str() {
                        "memory" => StorageBackend::Memory,
                        "sled" => StorageBackend::Sled,
                        _ => return Err(invalid()),
                    }
                }
                ENV_STORAGE_PATH => self.storage.path = PathBuf::from(&value),
                ENV_EVENT_CAPACITY => {
                    self.events.channel_capacity = value.parse().map_err(|_| invalid())?
                }
                ENV_KEEPER_POLL_SECS => {
                    self.keeper.poll_period_secs = value.parse().map_err(|_| invalid())?
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>, SettingsError> {
        match self.storage.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryRecordStore::new())),
            StorageBackend::Sled => {
                let store =
                    SledRecordStore::new(&self.storage.path).map_err(SettingsError::Storage)?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Assemble a faucet over the configured store.
    pub fn build_faucet(
        &self,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Faucet, SettingsError> {
        let store = self.open_store()?;
        let events = Arc::new(EventLog::new(self.events.channel_capacity));
        info!(
            target: "faucet",
            program_id = %self.program_id,
            backend = ?self.storage.backend,
            "Opening faucet"
        );
        Ok(Faucet::new(self.program_id, store, ledger, clock).with_event_log(events))
    }
}
