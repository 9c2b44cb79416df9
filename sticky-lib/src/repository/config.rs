use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    fs::{config_dir, state_dir},
    lock::PasswordStorage,
    scheduler::RecurrencePolicy,
};

const CURRENT_CONFIG_VERSION: u16 = 1;
const FILE_NAME: &str = "core.toml";

/// Handle to the core configuration
pub type Cfg = Arc<RwLock<CoreConfig>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to access configuration: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The core configuration, serialized to TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    version: u16,
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub lock: LockConfig,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// Embedded agdb database, shared between windows of one process only
    Db,
    /// JSON file replaced atomically on every save, safe to share between processes
    #[default]
    File,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Overrides the default location inside the state directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub recurrence: RecurrencePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            recurrence: RecurrencePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub password_storage: PasswordStorage,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            password_storage: PasswordStorage::default(),
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            store: StoreConfig::default(),
            scheduler: SchedulerConfig::default(),
            lock: LockConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load the configuration from the default location, writing the defaults there on first run.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&config_dir()?.join(FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring invalid configuration {}: {err}", path.display());
                Self::default()
            }))
        } else {
            let cfg = Self::default();
            cfg.save_to(path)?;
            Ok(cfg)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;

        Ok(())
    }

    /// Where the note collection lives for the configured backend.
    pub fn store_path(&self) -> Result<PathBuf, Error> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }

        let file_name = match self.store.backend {
            StoreBackend::Db => "notes.db",
            StoreBackend::File => "notes.json",
        };

        Ok(state_dir()?.join(file_name))
    }

    pub fn into_handle(self) -> Cfg {
        Arc::new(RwLock::new(self))
    }

    #[cfg(test)]
    /// Configuration with cheap password hashing for tests.
    pub(crate) fn mock() -> Self {
        Self {
            lock: LockConfig {
                argon2_memory_kib: 64,
                argon2_iterations: 1,
                ..LockConfig::default()
            },
            ..Self::default()
        }
    }
}
