//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Conservation: Σ(energy_sold) == Σ(energy_consumed), funds supply constant
//! - Monotonic counters never decrease
//! - Failed operations leave state and balances untouched
//! - Only the owner can change prices

use energy_ledger::{
    funds::{FundsLedger, InMemoryFunds},
    EnergyLedger, LedgerError, LedgerState, Principal, ProducerInfo,
};
use proptest::prelude::*;

const PRINCIPALS: [&str; 4] = ["deployer", "wallet_1", "wallet_2", "wallet_3"];

/// A single ledger call
#[derive(Debug, Clone)]
enum Op {
    RegisterProducer { caller: usize, energy: u64, price: u64 },
    RegisterConsumer { caller: usize },
    Buy { caller: usize, producer: usize, amount: u64 },
    Update { caller: usize, amount: u64 },
    SetPrice { caller: usize, producer: usize, price: u64 },
}

/// Strategy for principal indices
fn who() -> impl Strategy<Value = usize> {
    0..PRINCIPALS.len()
}

/// Strategy for ledger calls, zero amounts included
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (who(), 0u64..200, 0u64..20)
            .prop_map(|(caller, energy, price)| Op::RegisterProducer { caller, energy, price }),
        who().prop_map(|caller| Op::RegisterConsumer { caller }),
        (who(), who(), 0u64..150)
            .prop_map(|(caller, producer, amount)| Op::Buy { caller, producer, amount }),
        (who(), 0u64..200).prop_map(|(caller, amount)| Op::Update { caller, amount }),
        (who(), who(), 0u64..20)
            .prop_map(|(caller, producer, price)| Op::SetPrice { caller, producer, price }),
    ]
}

fn principal(index: usize) -> Principal {
    Principal::new(PRINCIPALS[index])
}

fn funded() -> InMemoryFunds {
    PRINCIPALS
        .iter()
        .fold(InMemoryFunds::new(), |funds, p| funds.with_balance(*p, 2_000))
}

fn apply(ledger: &mut EnergyLedger, funds: &mut InMemoryFunds, op: &Op) -> Result<(), LedgerError> {
    match *op {
        Op::RegisterProducer { caller, energy, price } => {
            ledger.register_producer(&principal(caller), energy, price)
        }
        Op::RegisterConsumer { caller } => ledger.register_consumer(&principal(caller)),
        Op::Buy { caller, producer, amount } => ledger
            .buy_energy(&principal(caller), &principal(producer), amount, funds)
            .map(|_| ()),
        Op::Update { caller, amount } => ledger.update_energy(&principal(caller), amount),
        Op::SetPrice { caller, producer, price } => {
            ledger.set_energy_price(&principal(caller), &principal(producer), price)
        }
    }
}

fn balances(funds: &InMemoryFunds) -> Vec<u64> {
    PRINCIPALS
        .iter()
        .map(|p| funds.balance(&Principal::new(*p)))
        .collect()
}

fn assert_counters_monotonic(before: &LedgerState, after: &LedgerState) {
    for (owner, old) in &before.producers {
        let new = &after.producers[owner];
        assert!(new.energy_sold >= old.energy_sold);
        assert!(new.price_per_unit > 0);
    }
    for (owner, old) in &before.consumers {
        let new = &after.consumers[owner];
        assert!(new.energy_consumed >= old.energy_consumed);
        assert!(new.total_spent >= old.total_spent);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: registration followed by lookup returns exactly what was registered
    #[test]
    fn prop_register_then_info(energy in 1u64..u64::MAX, price in 1u64..u64::MAX) {
        let mut ledger = EnergyLedger::new(principal(0));
        ledger.register_producer(&principal(1), energy, price).unwrap();
        prop_assert_eq!(
            ledger.get_producer_info(&principal(1)).unwrap(),
            ProducerInfo { energy_available: energy, price_per_unit: price }
        );
    }

    /// Property: zero energy or zero price is always rejected
    #[test]
    fn prop_register_rejects_zero(energy in 0u64..10, price in 0u64..10) {
        prop_assume!(energy == 0 || price == 0);
        let mut ledger = EnergyLedger::new(principal(0));
        prop_assert_eq!(
            ledger.register_producer(&principal(1), energy, price),
            Err(LedgerError::InvalidAmount)
        );
        prop_assert_eq!(ledger.producer_count(), 0);
    }

    /// Property: only the owner can set a price
    #[test]
    fn prop_only_owner_sets_price(caller in 1usize..4, price in 0u64..100) {
        let mut ledger = EnergyLedger::new(principal(0));
        ledger.register_producer(&principal(1), 10, 5).unwrap();
        prop_assert_eq!(
            ledger.set_energy_price(&principal(caller), &principal(1), price),
            Err(LedgerError::NotOwner)
        );
        prop_assert_eq!(ledger.get_producer_info(&principal(1)).unwrap().price_per_unit, 5);
    }

    /// Property: invariants hold after every step of any operation sequence
    #[test]
    fn prop_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = EnergyLedger::new(principal(0));
        let mut funds = funded();
        let supply = funds.total_supply();

        for op in &ops {
            let before = ledger.snapshot();
            let before_balances = balances(&funds);

            match apply(&mut ledger, &mut funds, op) {
                Ok(()) => {
                    let after = ledger.snapshot();
                    prop_assert_eq!(after.sequence, before.sequence + 1);
                    assert_counters_monotonic(&before, &after);
                }
                Err(_) => {
                    // Failure is the only observable effect
                    prop_assert_eq!(&ledger.snapshot(), &before);
                    prop_assert_eq!(balances(&funds), before_balances);
                }
            }

            let state = ledger.state();
            prop_assert_eq!(state.total_energy_sold(), state.total_energy_consumed());
            prop_assert_eq!(funds.total_supply(), supply);
            for record in state.producers.values() {
                prop_assert!(record.price_per_unit > 0);
            }
        }
    }

    /// Property: a successful purchase moves energy and funds by exactly the same amounts
    #[test]
    fn prop_purchase_conservation(
        stock in 1u64..1_000,
        price in 1u64..50,
        amount in 1u64..1_000,
    ) {
        let mut ledger = EnergyLedger::new(principal(0));
        let mut funds = InMemoryFunds::new().with_balance("wallet_3", 100_000);
        ledger.register_producer(&principal(1), stock, price).unwrap();
        ledger.register_consumer(&principal(3)).unwrap();

        let result = ledger.buy_energy(&principal(3), &principal(1), amount, &mut funds);
        if amount > stock {
            prop_assert!(
                matches!(result, Err(LedgerError::InsufficientEnergy { .. })),
                "expected insufficient-energy"
            );
            prop_assert_eq!(ledger.get_energy_sold(&principal(1)).unwrap(), 0);
        } else {
            let settlement = result.unwrap();
            prop_assert_eq!(settlement.cost, amount * price);
            prop_assert_eq!(ledger.get_energy_sold(&principal(1)).unwrap(), amount);
            prop_assert_eq!(ledger.get_energy_purchased(&principal(3)).unwrap(), amount);
            prop_assert_eq!(
                ledger.get_producer_info(&principal(1)).unwrap().energy_available,
                stock - amount
            );
            prop_assert_eq!(
                ledger.get_consumer_info(&principal(3)).unwrap().total_spent,
                amount * price
            );
            prop_assert_eq!(funds.balance(&principal(1)), amount * price);
            prop_assert_eq!(funds.balance(&principal(3)), 100_000 - amount * price);
        }
    }
}
