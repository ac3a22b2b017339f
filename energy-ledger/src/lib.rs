//! Energy Trading Ledger
//!
//! Peer-to-peer energy marketplace: producers list energy at a price,
//! consumers buy against producer inventory, and the ledger keeps running
//! totals of energy sold, energy purchased and funds spent.
//!
//! # Architecture
//!
//! - **State machine**: [`ledger::EnergyLedger`] applies each operation atomically
//! - **Single Writer**: One actor task owns the ledger; callers hold a [`actor::LedgerHandle`]
//! - **Settlement**: Purchases move funds through a [`funds::FundsLedger`] collaborator
//! - **Durability**: Every commit is saved through a [`storage::StateStore`]
//!
//! # Invariants
//!
//! - No double-spend: `energy_available` never goes below zero
//! - Conservation: energy sold == energy purchased; funds move, never appear
//! - Monotonic counters: `energy_sold`, `energy_consumed`, `total_spent` never decrease
//! - Authorization: only the fixed owner may set prices
//! - Atomicity: a failed operation leaves no trace

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod error;
pub mod funds;
pub mod ledger;
pub mod storage;
pub mod actor;
pub mod config;
pub mod metrics;
pub mod service;

// Re-exports
pub use error::{Error, LedgerError, Result};
pub use types::{
    ConsumerInfo, ConsumerRecord, EventKind, LedgerEvent, LedgerState, Principal, ProducerInfo,
    ProducerRecord,
};
pub use ledger::EnergyLedger;
pub use config::Config;
pub use service::EnergyService;
