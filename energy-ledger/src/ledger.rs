//! Energy trading state machine
//!
//! [`EnergyLedger`] owns every producer and consumer record and applies each
//! operation as one indivisible transition: all preconditions are checked and
//! all new values computed before the first field is written. It is a plain
//! `&mut self` type; concurrent access goes through the actor in
//! [`crate::actor`].
//!
//! # Example
//!
//! ```
//! use energy_ledger::{funds::InMemoryFunds, ledger::EnergyLedger, Principal};
//!
//! let owner = Principal::new("deployer");
//! let producer = Principal::new("wallet_1");
//! let consumer = Principal::new("wallet_3");
//!
//! let mut ledger = EnergyLedger::new(owner);
//! let mut funds = InMemoryFunds::new().with_balance("wallet_3", 1_000);
//!
//! ledger.register_producer(&producer, 100, 5).unwrap();
//! ledger.register_consumer(&consumer).unwrap();
//! ledger.buy_energy(&consumer, &producer, 20, &mut funds).unwrap();
//!
//! assert_eq!(ledger.get_producer_info(&producer).unwrap().energy_available, 80);
//! assert_eq!(ledger.get_consumer_info(&consumer).unwrap().total_spent, 100);
//! ```

use crate::error::LedgerError;
use crate::funds::{FundsError, FundsLedger};
use crate::types::{
    ConsumerInfo, ConsumerRecord, EventKind, LedgerEvent, LedgerState, Principal, ProducerInfo,
    ProducerRecord,
};
use chrono::Utc;
use std::collections::VecDeque;
use uuid::Uuid;

/// Default number of events retained before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Outcome of a committed purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Selling producer
    pub producer: Principal,
    /// Buying consumer
    pub consumer: Principal,
    /// Units transferred
    pub amount: u64,
    /// Funds transferred
    pub cost: u64,
}

/// Point to roll the ledger back to
#[derive(Debug, Clone)]
pub struct Checkpoint {
    state: LedgerState,
}

/// In-memory authoritative trading ledger
#[derive(Debug, Clone)]
pub struct EnergyLedger {
    state: LedgerState,
    events: VecDeque<LedgerEvent>,
    event_capacity: usize,
}

impl EnergyLedger {
    /// Empty ledger administered by `owner`
    pub fn new(owner: Principal) -> Self {
        Self::from_state(LedgerState::new(owner))
    }

    /// Resume from a previously saved state
    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state,
            events: VecDeque::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Retain at most `capacity` undrained events (minimum 1); older ones are dropped
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        while self.events.len() > self.event_capacity {
            self.events.pop_front();
        }
        self
    }

    // ───────────────────────── Registration ─────────────────────────

    /// List `caller` as a producer offering `energy_amount` units at `price`.
    pub fn register_producer(
        &mut self,
        caller: &Principal,
        energy_amount: u64,
        price: u64,
    ) -> Result<(), LedgerError> {
        if energy_amount == 0 || price == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.state.producers.contains_key(caller) {
            return Err(LedgerError::AlreadyRegistered);
        }

        self.state.producers.insert(
            caller.clone(),
            ProducerRecord {
                owner: caller.clone(),
                energy_available: energy_amount,
                price_per_unit: price,
                energy_sold: 0,
            },
        );
        self.commit(
            caller,
            EventKind::ProducerRegistered {
                energy_amount,
                price,
            },
        );
        Ok(())
    }

    /// Open a consumer account for `caller`.
    pub fn register_consumer(&mut self, caller: &Principal) -> Result<(), LedgerError> {
        if self.state.consumers.contains_key(caller) {
            return Err(LedgerError::AlreadyRegistered);
        }

        self.state.consumers.insert(
            caller.clone(),
            ConsumerRecord {
                owner: caller.clone(),
                energy_consumed: 0,
                total_spent: 0,
            },
        );
        self.commit(caller, EventKind::ConsumerRegistered);
        Ok(())
    }

    // ───────────────────────── Settlement ─────────────────────────

    /// Buy `amount` units from `producer`, paying from `caller`'s funds.
    ///
    /// Preconditions are checked in a fixed order and the first failure wins:
    /// producer exists, amount positive, enough energy, enough funds, caller is
    /// a registered consumer. Nothing is written, funds included, unless every
    /// check passes.
    pub fn buy_energy(
        &mut self,
        caller: &Principal,
        producer: &Principal,
        amount: u64,
        funds: &mut dyn FundsLedger,
    ) -> Result<Settlement, LedgerError> {
        let listing = self
            .state
            .producers
            .get(producer)
            .ok_or(LedgerError::ProducerNotFound)?;

        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if amount > listing.energy_available {
            return Err(LedgerError::InsufficientEnergy {
                requested: amount,
                available: listing.energy_available,
            });
        }

        let cost = amount
            .checked_mul(listing.price_per_unit)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let balance = funds.balance(caller);
        if balance < cost {
            return Err(LedgerError::InsufficientFunds {
                required: cost,
                available: balance,
            });
        }

        let account = self
            .state
            .consumers
            .get(caller)
            .ok_or(LedgerError::ConsumerNotFound)?;

        let energy_available = listing.energy_available - amount;
        let energy_sold = listing
            .energy_sold
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let energy_consumed = account
            .energy_consumed
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let total_spent = account
            .total_spent
            .checked_add(cost)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        funds
            .transfer(caller, producer, cost)
            .map_err(|err| match err {
                FundsError::Insufficient {
                    required,
                    available,
                } => LedgerError::InsufficientFunds {
                    required,
                    available,
                },
                FundsError::Overflow => LedgerError::ArithmeticOverflow,
            })?;

        // Infallible from here on
        if let Some(listing) = self.state.producers.get_mut(producer) {
            listing.energy_available = energy_available;
            listing.energy_sold = energy_sold;
        }
        if let Some(account) = self.state.consumers.get_mut(caller) {
            account.energy_consumed = energy_consumed;
            account.total_spent = total_spent;
        }

        self.commit(
            caller,
            EventKind::EnergyPurchased {
                producer: producer.clone(),
                amount,
                cost,
            },
        );

        Ok(Settlement {
            producer: producer.clone(),
            consumer: caller.clone(),
            amount,
            cost,
        })
    }

    // ───────────────────────── Producer Updates ─────────────────────────

    /// Replace `caller`'s available energy with `new_amount`.
    pub fn update_energy(&mut self, caller: &Principal, new_amount: u64) -> Result<(), LedgerError> {
        let listing = self
            .state
            .producers
            .get_mut(caller)
            .ok_or(LedgerError::ProducerNotFound)?;
        if new_amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        listing.energy_available = new_amount;
        self.commit(caller, EventKind::EnergyUpdated { new_amount });
        Ok(())
    }

    /// Set `producer`'s price. Owner-only.
    pub fn set_energy_price(
        &mut self,
        caller: &Principal,
        producer: &Principal,
        new_price: u64,
    ) -> Result<(), LedgerError> {
        if *caller != self.state.owner {
            return Err(LedgerError::NotOwner);
        }
        if new_price == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let listing = self
            .state
            .producers
            .get_mut(producer)
            .ok_or(LedgerError::ProducerNotFound)?;

        listing.price_per_unit = new_price;
        self.commit(
            caller,
            EventKind::PriceSet {
                producer: producer.clone(),
                new_price,
            },
        );
        Ok(())
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Available energy and price of `producer`
    pub fn get_producer_info(&self, producer: &Principal) -> Result<ProducerInfo, LedgerError> {
        self.producer(producer)
            .map(ProducerRecord::info)
            .ok_or(LedgerError::ProducerNotFound)
    }

    /// Purchase totals of `consumer`
    pub fn get_consumer_info(&self, consumer: &Principal) -> Result<ConsumerInfo, LedgerError> {
        self.consumer(consumer)
            .map(ConsumerRecord::info)
            .ok_or(LedgerError::ConsumerNotFound)
    }

    /// Cumulative units sold by `producer`
    pub fn get_energy_sold(&self, producer: &Principal) -> Result<u64, LedgerError> {
        self.producer(producer)
            .map(|p| p.energy_sold)
            .ok_or(LedgerError::ProducerNotFound)
    }

    /// Cumulative units bought by `consumer`
    pub fn get_energy_purchased(&self, consumer: &Principal) -> Result<u64, LedgerError> {
        self.consumer(consumer)
            .map(|c| c.energy_consumed)
            .ok_or(LedgerError::ConsumerNotFound)
    }

    /// Full producer record
    pub fn producer(&self, producer: &Principal) -> Option<&ProducerRecord> {
        self.state.producers.get(producer)
    }

    /// Full consumer record
    pub fn consumer(&self, consumer: &Principal) -> Option<&ConsumerRecord> {
        self.state.consumers.get(consumer)
    }

    /// Administrative principal
    pub fn owner(&self) -> &Principal {
        &self.state.owner
    }

    /// Number of registered producers
    pub fn producer_count(&self) -> usize {
        self.state.producers.len()
    }

    /// Number of registered consumers
    pub fn consumer_count(&self) -> usize {
        self.state.consumers.len()
    }

    /// Borrow the current state
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Clone the current state
    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    // ───────────────────────── Events ─────────────────────────

    /// Most recent events committed since construction or the last drain,
    /// oldest first
    pub fn events(&self) -> &VecDeque<LedgerEvent> {
        &self.events
    }

    /// Maximum number of retained events
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Drain all events (consume and clear)
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.events.drain(..).collect()
    }

    // ───────────────────────── Rollback ─────────────────────────

    /// Capture the current state for a later [`restore`](Self::restore)
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state.clone(),
        }
    }

    /// Discard every change made since `checkpoint`
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        let sequence = checkpoint.state.sequence;
        while self.events.back().map_or(false, |e| e.sequence > sequence) {
            self.events.pop_back();
        }
        self.state = checkpoint.state;
    }

    fn commit(&mut self, caller: &Principal, kind: EventKind) {
        self.state.sequence = self.state.sequence.saturating_add(1);
        if self.events.len() >= self.event_capacity {
            self.events.pop_front();
        }
        self.events.push_back(LedgerEvent {
            event_id: Uuid::now_v7(),
            sequence: self.state.sequence,
            caller: caller.clone(),
            kind,
            timestamp: Utc::now(),
        });
    }
}
