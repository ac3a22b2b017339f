//! Error types for the ledger

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for service-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed taxonomy of trading failures.
///
/// Every variant maps to a stable numeric code. A `LedgerError` is always
/// returned before any state is touched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerError {
    /// Caller is not the ledger owner
    #[error("not-owner: caller is not the ledger owner")]
    NotOwner,

    /// A numeric parameter violates its positivity constraint
    #[error("invalid-amount: amount must be positive")]
    InvalidAmount,

    /// Referenced producer is not registered
    #[error("producer-not-found")]
    ProducerNotFound,

    /// Purchase exceeds the producer's available energy
    #[error("insufficient-energy: requested {requested}, available {available}")]
    InsufficientEnergy {
        /// Units requested
        requested: u64,
        /// Units on offer
        available: u64,
    },

    /// Caller's balance cannot cover the purchase cost
    #[error("insufficient-funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Purchase cost
        required: u64,
        /// Caller balance
        available: u64,
    },

    /// Referenced consumer is not registered
    #[error("consumer-not-found")]
    ConsumerNotFound,

    /// Principal already holds a record of this kind
    #[error("already-registered")]
    AlreadyRegistered,

    /// A cost or cumulative counter would overflow
    #[error("arithmetic-overflow")]
    ArithmeticOverflow,
}

impl LedgerError {
    /// Stable numeric failure code
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::NotOwner => 100,
            LedgerError::InvalidAmount => 101,
            LedgerError::ProducerNotFound => 102,
            LedgerError::InsufficientEnergy { .. } => 103,
            LedgerError::InsufficientFunds { .. } => 104,
            LedgerError::ConsumerNotFound => 105,
            LedgerError::AlreadyRegistered => 106,
            LedgerError::ArithmeticOverflow => 107,
        }
    }

    /// Kebab-case name used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            LedgerError::NotOwner => "not-owner",
            LedgerError::InvalidAmount => "invalid-amount",
            LedgerError::ProducerNotFound => "producer-not-found",
            LedgerError::InsufficientEnergy { .. } => "insufficient-energy",
            LedgerError::InsufficientFunds { .. } => "insufficient-funds",
            LedgerError::ConsumerNotFound => "consumer-not-found",
            LedgerError::AlreadyRegistered => "already-registered",
            LedgerError::ArithmeticOverflow => "arithmetic-overflow",
        }
    }
}

/// Service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Operation rejected by the ledger
    #[error("Ledger rejected operation: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Snapshot failed integrity checks
    #[error("Corrupted snapshot: {0}")]
    Corrupted(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The domain failure, if this error is one
    pub fn ledger_error(&self) -> Option<LedgerError> {
        match self {
            Error::Ledger(err) => Some(*err),
            _ => None,
        }
    }
}
