//! Funds balance collaborator
//!
//! The ledger does not own money. Purchases settle against a [`FundsLedger`],
//! which must move funds all-or-nothing: a failed transfer leaves both
//! balances exactly as they were.

use crate::types::Principal;
use std::collections::HashMap;
use thiserror::Error;

/// Transfer failures reported by a funds collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FundsError {
    /// Sender cannot cover the transfer
    #[error("Insufficient funds: required {required}, available {available}")]
    Insufficient {
        /// Transfer amount
        required: u64,
        /// Sender balance
        available: u64,
    },

    /// Recipient balance would overflow
    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Atomic debit/credit service
pub trait FundsLedger: Send {
    /// Spendable balance of `principal` (zero when unknown)
    fn balance(&self, principal: &Principal) -> u64;

    /// Move `amount` from `from` to `to`, all-or-nothing
    fn transfer(&mut self, from: &Principal, to: &Principal, amount: u64)
        -> Result<(), FundsError>;

    /// Add `amount` to `principal`'s balance
    fn credit(&mut self, principal: &Principal, amount: u64) -> Result<(), FundsError>;
}

/// In-memory balances keyed by principal
#[derive(Debug, Clone, Default)]
pub struct InMemoryFunds {
    balances: HashMap<Principal, u64>,
}

impl InMemoryFunds {
    /// Create with no balances
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a balance
    pub fn with_balance(mut self, principal: impl Into<Principal>, amount: u64) -> Self {
        self.balances.insert(principal.into(), amount);
        self
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }
}

impl FundsLedger for InMemoryFunds {
    fn balance(&self, principal: &Principal) -> u64 {
        self.balances.get(principal).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &Principal,
        to: &Principal,
        amount: u64,
    ) -> Result<(), FundsError> {
        let available = self.balance(from);
        if available < amount {
            return Err(FundsError::Insufficient {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        // Compute both sides before touching either
        let new_from = available - amount;
        let new_to = self
            .balance(to)
            .checked_add(amount)
            .ok_or(FundsError::Overflow)?;

        self.balances.insert(from.clone(), new_from);
        self.balances.insert(to.clone(), new_to);
        Ok(())
    }

    fn credit(&mut self, principal: &Principal, amount: u64) -> Result<(), FundsError> {
        let current = self.balances.entry(principal.clone()).or_insert(0);
        *current = current.checked_add(amount).ok_or(FundsError::Overflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::new("alice")
    }

    fn bob() -> Principal {
        Principal::new("bob")
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut funds = InMemoryFunds::new().with_balance("alice", 100);
        funds.transfer(&alice(), &bob(), 40).unwrap();
        assert_eq!(funds.balance(&alice()), 60);
        assert_eq!(funds.balance(&bob()), 40);
        assert_eq!(funds.total_supply(), 100);
    }

    #[test]
    fn test_transfer_insufficient_leaves_balances() {
        let mut funds = InMemoryFunds::new().with_balance("alice", 10);
        let err = funds.transfer(&alice(), &bob(), 11).unwrap_err();
        assert_eq!(
            err,
            FundsError::Insufficient {
                required: 11,
                available: 10
            }
        );
        assert_eq!(funds.balance(&alice()), 10);
        assert_eq!(funds.balance(&bob()), 0);
    }

    #[test]
    fn test_transfer_overflow_leaves_balances() {
        let mut funds = InMemoryFunds::new()
            .with_balance("alice", 10)
            .with_balance("bob", u64::MAX);
        assert_eq!(funds.transfer(&alice(), &bob(), 1), Err(FundsError::Overflow));
        assert_eq!(funds.balance(&alice()), 10);
        assert_eq!(funds.balance(&bob()), u64::MAX);
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let mut funds = InMemoryFunds::new().with_balance("alice", 10);
        funds.transfer(&alice(), &alice(), 10).unwrap();
        assert_eq!(funds.balance(&alice()), 10);
    }

    #[test]
    fn test_credit_accumulates_and_rejects_overflow() {
        let mut funds = InMemoryFunds::new();
        funds.credit(&alice(), 5).unwrap();
        funds.credit(&alice(), 7).unwrap();
        assert_eq!(funds.balance(&alice()), 12);
        assert_eq!(funds.credit(&alice(), u64::MAX), Err(FundsError::Overflow));
        assert_eq!(funds.balance(&alice()), 12);
    }
}
