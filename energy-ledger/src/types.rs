//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode, ordered maps)
//! - Exact integer arithmetic for energy and funds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque, externally authenticated identity (wallet address, service id, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create new principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Trading state of a registered producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRecord {
    /// Producer principal
    pub owner: Principal,

    /// Units currently on offer
    pub energy_available: u64,

    /// Currency units per energy unit (always > 0)
    pub price_per_unit: u64,

    /// Cumulative units sold
    pub energy_sold: u64,
}

impl ProducerRecord {
    /// Public listing view
    pub fn info(&self) -> ProducerInfo {
        ProducerInfo {
            energy_available: self.energy_available,
            price_per_unit: self.price_per_unit,
        }
    }
}

/// Trading state of a registered consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerRecord {
    /// Consumer principal
    pub owner: Principal,

    /// Cumulative units purchased
    pub energy_consumed: u64,

    /// Cumulative funds spent
    pub total_spent: u64,
}

impl ConsumerRecord {
    /// Public totals view
    pub fn info(&self) -> ConsumerInfo {
        ConsumerInfo {
            energy_consumed: self.energy_consumed,
            total_spent: self.total_spent,
        }
    }
}

/// Result of `get-producer-info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInfo {
    /// Units currently on offer
    pub energy_available: u64,
    /// Currency units per energy unit
    pub price_per_unit: u64,
}

/// Result of `get-consumer-info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerInfo {
    /// Cumulative units purchased
    pub energy_consumed: u64,
    /// Cumulative funds spent
    pub total_spent: u64,
}

/// Complete ledger state, the unit of load/save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Administrative principal, fixed at creation
    pub owner: Principal,

    /// Producer records by principal
    pub producers: BTreeMap<Principal, ProducerRecord>,

    /// Consumer records by principal
    pub consumers: BTreeMap<Principal, ConsumerRecord>,

    /// Number of committed mutations
    pub sequence: u64,
}

impl LedgerState {
    /// Empty state owned by `owner`
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            producers: BTreeMap::new(),
            consumers: BTreeMap::new(),
            sequence: 0,
        }
    }

    /// Sum of `energy_sold` across all producers
    pub fn total_energy_sold(&self) -> u128 {
        self.producers.values().map(|p| p.energy_sold as u128).sum()
    }

    /// Sum of `energy_consumed` across all consumers
    pub fn total_energy_consumed(&self) -> u128 {
        self.consumers.values().map(|c| c.energy_consumed as u128).sum()
    }
}

/// Record of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Ledger sequence number after this mutation
    pub sequence: u64,

    /// Principal that submitted the operation
    pub caller: Principal,

    /// What changed
    pub kind: EventKind,

    /// Commit time
    pub timestamp: DateTime<Utc>,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// New producer listing
    ProducerRegistered {
        /// Initial inventory
        energy_amount: u64,
        /// Initial price
        price: u64,
    },
    /// New consumer account
    ConsumerRegistered,
    /// Settled purchase
    EnergyPurchased {
        /// Selling producer
        producer: Principal,
        /// Units bought
        amount: u64,
        /// Funds transferred
        cost: u64,
    },
    /// Producer replaced its inventory
    EnergyUpdated {
        /// New inventory
        new_amount: u64,
    },
    /// Owner changed a producer's price
    PriceSet {
        /// Affected producer
        producer: Principal,
        /// New price
        new_price: u64,
    },
}
