//! Service orchestration layer
//!
//! Ties together configuration, the state store, the funds collaborator and
//! the actor into one handle.
//!
//! # Example
//!
//! ```no_run
//! use energy_ledger::{Config, EnergyService, Principal};
//!
//! #[tokio::main]
//! async fn main() -> energy_ledger::Result<()> {
//!     let config = Config::default();
//!     let service = EnergyService::open(config).await?;
//!
//!     let producer = Principal::new("wallet_1");
//!     service.handle().register_producer(&producer, 100, 5).await?;
//!
//!     service.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    config::StorageBackend,
    funds::{FundsLedger, InMemoryFunds},
    ledger::EnergyLedger,
    metrics::Metrics,
    storage::{MemoryStore, SnapshotStore, StateStore},
    types::Principal,
    Config, Error, Result,
};
use std::sync::Arc;

/// Running ledger service
pub struct EnergyService {
    /// Actor handle
    handle: LedgerHandle,

    /// State store shared with the actor
    store: Arc<dyn StateStore>,

    /// Metrics shared with the actor
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl EnergyService {
    /// Open with the configured store and an empty in-memory funds ledger.
    ///
    /// Balances held by [`InMemoryFunds`] are not persisted: with the
    /// snapshot backend, ledger totals survive a restart but producer
    /// proceeds and consumer deposits do not. Hosts that need durable
    /// balances use [`open_with_funds`](Self::open_with_funds) with their
    /// own [`FundsLedger`].
    pub async fn open(config: Config) -> Result<Self> {
        if config.storage.backend == StorageBackend::Snapshot {
            tracing::warn!(
                path = %config.storage.snapshot_path.display(),
                "Funds are held in memory and reset on restart"
            );
        }
        Self::open_with_funds(config, Box::new(InMemoryFunds::new())).await
    }

    /// Open with a caller-supplied funds collaborator
    pub async fn open_with_funds(config: Config, funds: Box<dyn FundsLedger>) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn StateStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Snapshot => Arc::new(SnapshotStore::open(&config.storage.snapshot_path)?),
        };

        Self::open_with_store(config, store, funds).await
    }

    /// Open against an explicit state store
    pub async fn open_with_store(
        config: Config,
        store: Arc<dyn StateStore>,
        funds: Box<dyn FundsLedger>,
    ) -> Result<Self> {
        let owner = Principal::new(config.owner.clone());

        let ledger = match store.load()? {
            Some(state) => {
                if state.owner != owner {
                    return Err(Error::Config(format!(
                        "Stored ledger belongs to owner {}, configured owner is {}",
                        state.owner, owner
                    )));
                }
                tracing::info!(
                    producers = state.producers.len(),
                    consumers = state.consumers.len(),
                    sequence = state.sequence,
                    "Recovered ledger state"
                );
                EnergyLedger::from_state(state)
            }
            None => {
                tracing::info!(owner = %owner, "Starting empty ledger");
                EnergyLedger::new(owner)
            }
        }
        .with_event_capacity(config.actor.event_log_capacity);

        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        let handle = spawn_ledger_actor(
            ledger,
            funds,
            store.clone(),
            metrics.clone(),
            config.actor.mailbox_capacity,
        );

        Ok(Self {
            handle,
            store,
            metrics,
            config,
        })
    }

    /// Cloneable handle for submitting operations
    pub fn handle(&self) -> &LedgerHandle {
        &self.handle
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// State store
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the persisted state matches the live state and that
    /// energy sold equals energy consumed across the ledger
    pub async fn verify(&self) -> Result<bool> {
        let live = self.handle.snapshot().await?;
        let persisted_matches = match self.store.load()? {
            Some(saved) => saved == live,
            // Nothing committed yet
            None => live.sequence == 0,
        };
        Ok(persisted_matches && live.total_energy_sold() == live.total_energy_consumed())
    }

    /// Shutdown service
    pub async fn shutdown(self) -> Result<()> {
        tracing::info!(service = %self.config.service_name, "Shutting down");
        self.handle.shutdown().await
    }
}
