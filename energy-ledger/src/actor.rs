//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the ledger, the funds collaborator and the state store
//! - Every operation, reads included, is a message handled in arrival order
//! - Bounded mailbox gives backpressure to callers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Callers (authenticated principals)           │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   checkpoint → apply → StateStore::save → reply      │
//! │   (restore checkpoint if save fails)                 │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::funds::FundsLedger;
use crate::ledger::{EnergyLedger, Settlement};
use crate::metrics::Metrics;
use crate::storage::StateStore;
use crate::types::{ConsumerInfo, LedgerEvent, LedgerState, Principal, ProducerInfo};
use crate::{Error, LedgerError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Register the caller as a producer
    RegisterProducer {
        caller: Principal,
        energy_amount: u64,
        price: u64,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Register the caller as a consumer
    RegisterConsumer {
        caller: Principal,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Purchase energy from a producer
    BuyEnergy {
        caller: Principal,
        producer: Principal,
        amount: u64,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Replace the caller's available energy
    UpdateEnergy {
        caller: Principal,
        new_amount: u64,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Owner sets a producer's price
    SetEnergyPrice {
        caller: Principal,
        producer: Principal,
        new_price: u64,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Producer listing
    GetProducerInfo {
        producer: Principal,
        response: oneshot::Sender<Result<ProducerInfo>>,
    },

    /// Consumer totals
    GetConsumerInfo {
        consumer: Principal,
        response: oneshot::Sender<Result<ConsumerInfo>>,
    },

    /// Producer cumulative sales
    GetEnergySold {
        producer: Principal,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Consumer cumulative purchases
    GetEnergyPurchased {
        consumer: Principal,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Consistent copy of the whole state
    Snapshot {
        response: oneshot::Sender<LedgerState>,
    },

    /// Take committed events
    DrainEvents {
        response: oneshot::Sender<Vec<LedgerEvent>>,
    },

    /// Credit funds to a principal
    Deposit {
        principal: Principal,
        amount: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Funds balance of a principal
    Balance {
        principal: Principal,
        response: oneshot::Sender<u64>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    ledger: EnergyLedger,
    funds: Box<dyn FundsLedger>,
    store: Arc<dyn StateStore>,
    metrics: Metrics,
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        ledger: EnergyLedger,
        funds: Box<dyn FundsLedger>,
        store: Arc<dyn StateStore>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        metrics.set_registrations(ledger.producer_count(), ledger.consumer_count());
        Self {
            ledger,
            funds,
            store,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                break;
            }
            self.handle_message(msg);
        }

        tracing::info!(
            sequence = self.ledger.state().sequence,
            "Ledger actor stopped"
        );
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::RegisterProducer {
                caller,
                energy_amount,
                price,
                response,
            } => {
                let result = self.apply("register_producer", &caller, |ledger, _| {
                    ledger
                        .register_producer(&caller, energy_amount, price)
                        .map(|_| None)
                });
                let _ = response.send(result);
            }

            LedgerMessage::RegisterConsumer { caller, response } => {
                let result = self.apply("register_consumer", &caller, |ledger, _| {
                    ledger.register_consumer(&caller).map(|_| None)
                });
                let _ = response.send(result);
            }

            LedgerMessage::BuyEnergy {
                caller,
                producer,
                amount,
                response,
            } => {
                let result = self.apply("buy_energy", &caller, |ledger, funds| {
                    ledger
                        .buy_energy(&caller, &producer, amount, funds)
                        .map(Some)
                });
                let _ = response.send(result);
            }

            LedgerMessage::UpdateEnergy {
                caller,
                new_amount,
                response,
            } => {
                let result = self.apply("update_energy", &caller, |ledger, _| {
                    ledger.update_energy(&caller, new_amount).map(|_| None)
                });
                let _ = response.send(result);
            }

            LedgerMessage::SetEnergyPrice {
                caller,
                producer,
                new_price,
                response,
            } => {
                let result = self.apply("set_energy_price", &caller, |ledger, _| {
                    ledger
                        .set_energy_price(&caller, &producer, new_price)
                        .map(|_| None)
                });
                let _ = response.send(result);
            }

            LedgerMessage::GetProducerInfo { producer, response } => {
                let _ = response.send(self.ledger.get_producer_info(&producer).map_err(Error::from));
            }

            LedgerMessage::GetConsumerInfo { consumer, response } => {
                let _ = response.send(self.ledger.get_consumer_info(&consumer).map_err(Error::from));
            }

            LedgerMessage::GetEnergySold { producer, response } => {
                let _ = response.send(self.ledger.get_energy_sold(&producer).map_err(Error::from));
            }

            LedgerMessage::GetEnergyPurchased { consumer, response } => {
                let _ = response.send(
                    self.ledger
                        .get_energy_purchased(&consumer)
                        .map_err(Error::from),
                );
            }

            LedgerMessage::Snapshot { response } => {
                let _ = response.send(self.ledger.snapshot());
            }

            LedgerMessage::DrainEvents { response } => {
                let _ = response.send(self.ledger.drain_events());
            }

            LedgerMessage::Deposit {
                principal,
                amount,
                response,
            } => {
                let result = self
                    .funds
                    .credit(&principal, amount)
                    .map(|_| self.funds.balance(&principal))
                    .map_err(|_| Error::Ledger(LedgerError::ArithmeticOverflow));
                let _ = response.send(result);
            }

            LedgerMessage::Balance {
                principal,
                response,
            } => {
                let _ = response.send(self.funds.balance(&principal));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Apply one mutation, persist it, and roll back if persisting fails
    fn apply<F>(&mut self, operation: &'static str, caller: &Principal, mutate: F) -> Result<bool>
    where
        F: FnOnce(
            &mut EnergyLedger,
            &mut dyn FundsLedger,
        ) -> std::result::Result<Option<Settlement>, LedgerError>,
    {
        let checkpoint = self.ledger.checkpoint();

        let settlement = match mutate(&mut self.ledger, self.funds.as_mut()) {
            Ok(settlement) => settlement,
            Err(err) => {
                self.metrics.record_operation(operation, err.name());
                tracing::warn!(
                    operation,
                    caller = %caller,
                    code = err.code(),
                    error = %err,
                    "Operation rejected"
                );
                return Err(err.into());
            }
        };

        if let Err(e) = self.store.save(self.ledger.state()) {
            tracing::error!(operation, error = %e, "Failed to persist state, rolling back");
            self.ledger.restore(checkpoint);
            if let Some(s) = &settlement {
                if let Err(refund) = self.funds.transfer(&s.producer, &s.consumer, s.cost) {
                    tracing::error!(
                        producer = %s.producer,
                        consumer = %s.consumer,
                        cost = s.cost,
                        error = %refund,
                        "Failed to reverse settlement"
                    );
                }
            }
            self.metrics.record_operation(operation, "storage-error");
            return Err(e);
        }

        if let Some(s) = &settlement {
            self.metrics.record_settlement(s.amount, s.cost);
        }
        self.metrics.record_operation(operation, "ok");
        self.metrics
            .set_registrations(self.ledger.producer_count(), self.ledger.consumer_count());

        tracing::debug!(
            operation,
            caller = %caller,
            sequence = self.ledger.state().sequence,
            "Operation committed"
        );
        Ok(true)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Register `caller` as a producer
    pub async fn register_producer(
        &self,
        caller: &Principal,
        energy_amount: u64,
        price: u64,
    ) -> Result<bool> {
        self.request(|response| LedgerMessage::RegisterProducer {
            caller: caller.clone(),
            energy_amount,
            price,
            response,
        })
        .await?
    }

    /// Register `caller` as a consumer
    pub async fn register_consumer(&self, caller: &Principal) -> Result<bool> {
        self.request(|response| LedgerMessage::RegisterConsumer {
            caller: caller.clone(),
            response,
        })
        .await?
    }

    /// Buy `amount` units from `producer`
    pub async fn buy_energy(
        &self,
        caller: &Principal,
        producer: &Principal,
        amount: u64,
    ) -> Result<bool> {
        self.request(|response| LedgerMessage::BuyEnergy {
            caller: caller.clone(),
            producer: producer.clone(),
            amount,
            response,
        })
        .await?
    }

    /// Replace `caller`'s available energy
    pub async fn update_energy(&self, caller: &Principal, new_amount: u64) -> Result<bool> {
        self.request(|response| LedgerMessage::UpdateEnergy {
            caller: caller.clone(),
            new_amount,
            response,
        })
        .await?
    }

    /// Set `producer`'s price (owner only)
    pub async fn set_energy_price(
        &self,
        caller: &Principal,
        producer: &Principal,
        new_price: u64,
    ) -> Result<bool> {
        self.request(|response| LedgerMessage::SetEnergyPrice {
            caller: caller.clone(),
            producer: producer.clone(),
            new_price,
            response,
        })
        .await?
    }

    /// Get producer listing
    pub async fn get_producer_info(&self, producer: &Principal) -> Result<ProducerInfo> {
        self.request(|response| LedgerMessage::GetProducerInfo {
            producer: producer.clone(),
            response,
        })
        .await?
    }

    /// Get consumer totals
    pub async fn get_consumer_info(&self, consumer: &Principal) -> Result<ConsumerInfo> {
        self.request(|response| LedgerMessage::GetConsumerInfo {
            consumer: consumer.clone(),
            response,
        })
        .await?
    }

    /// Get producer cumulative sales
    pub async fn get_energy_sold(&self, producer: &Principal) -> Result<u64> {
        self.request(|response| LedgerMessage::GetEnergySold {
            producer: producer.clone(),
            response,
        })
        .await?
    }

    /// Get consumer cumulative purchases
    pub async fn get_energy_purchased(&self, consumer: &Principal) -> Result<u64> {
        self.request(|response| LedgerMessage::GetEnergyPurchased {
            consumer: consumer.clone(),
            response,
        })
        .await?
    }

    /// Consistent copy of the ledger state
    pub async fn snapshot(&self) -> Result<LedgerState> {
        self.request(|response| LedgerMessage::Snapshot { response })
            .await
    }

    /// Take events committed since the last drain
    pub async fn drain_events(&self) -> Result<Vec<LedgerEvent>> {
        self.request(|response| LedgerMessage::DrainEvents { response })
            .await
    }

    /// Credit funds; returns the new balance
    pub async fn deposit(&self, principal: &Principal, amount: u64) -> Result<u64> {
        self.request(|response| LedgerMessage::Deposit {
            principal: principal.clone(),
            amount,
            response,
        })
        .await?
    }

    /// Funds balance
    pub async fn balance(&self, principal: &Principal) -> Result<u64> {
        self.request(|response| LedgerMessage::Balance {
            principal: principal.clone(),
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    ledger: EnergyLedger,
    funds: Box<dyn FundsLedger>,
    store: Arc<dyn StateStore>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, funds, store, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
