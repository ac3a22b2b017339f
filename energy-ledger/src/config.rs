//! Configuration for the ledger service

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Administrative principal, fixed for the lifetime of the ledger
    pub owner: String,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "deployer".to_string(),
            service_name: "energy-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where committed state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Keep state in memory only
    Memory,
    /// Checksummed snapshot file
    Snapshot,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Snapshot file (used by the `snapshot` backend)
    pub snapshot_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Snapshot,
            snapshot_path: PathBuf::from("./data/energy-ledger.snap"),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,

    /// Undrained events kept in memory; the oldest are dropped past this
    pub event_log_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            event_log_capacity: crate::ledger::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(owner) = std::env::var("ENERGY_LEDGER_OWNER") {
            config.owner = owner;
        }

        if let Ok(path) = std::env::var("ENERGY_LEDGER_SNAPSHOT_PATH") {
            config.storage.snapshot_path = PathBuf::from(path);
        }

        if let Ok(capacity) = std::env::var("ENERGY_LEDGER_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid ENERGY_LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Ok(capacity) = std::env::var("ENERGY_LEDGER_EVENT_LOG_CAPACITY") {
            config.actor.event_log_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid ENERGY_LEDGER_EVENT_LOG_CAPACITY: {}", e))
            })?;
        }

        if let Ok(json) = std::env::var("ENERGY_LEDGER_LOG_JSON") {
            config.logging.json = matches!(json.as_str(), "1" | "true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject unusable settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.owner.trim().is_empty() {
            return Err(crate::Error::Config("owner must not be empty".to_string()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be positive".to_string(),
            ));
        }
        if self.actor.event_log_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.event_log_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
