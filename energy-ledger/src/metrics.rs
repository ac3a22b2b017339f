//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `energy_ledger_operations_total{operation, outcome}` - Operations processed
//! - `energy_ledger_energy_traded_total` - Energy units sold through purchases
//! - `energy_ledger_funds_settled_total` - Funds moved by purchases
//! - `energy_ledger_producers` - Registered producers
//! - `energy_ledger_consumers` - Registered consumers

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Operations by name and outcome (`ok` or an error name)
    pub operations_total: IntCounterVec,

    /// Energy units sold
    pub energy_traded: IntCounter,

    /// Funds settled
    pub funds_settled: IntCounter,

    /// Registered producers
    pub producers: IntGauge,

    /// Registered consumers
    pub consumers: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new(
                "energy_ledger_operations_total",
                "Ledger operations by name and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let energy_traded = IntCounter::new(
            "energy_ledger_energy_traded_total",
            "Energy units sold through purchases",
        )?;
        registry.register(Box::new(energy_traded.clone()))?;

        let funds_settled = IntCounter::new(
            "energy_ledger_funds_settled_total",
            "Funds transferred by purchases",
        )?;
        registry.register(Box::new(funds_settled.clone()))?;

        let producers = IntGauge::new("energy_ledger_producers", "Registered producers")?;
        registry.register(Box::new(producers.clone()))?;

        let consumers = IntGauge::new("energy_ledger_consumers", "Registered consumers")?;
        registry.register(Box::new(consumers.clone()))?;

        Ok(Self {
            operations_total,
            energy_traded,
            funds_settled,
            producers,
            consumers,
            registry,
        })
    }

    /// Record an operation outcome
    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record a settled purchase
    pub fn record_settlement(&self, amount: u64, cost: u64) {
        self.energy_traded.inc_by(amount);
        self.funds_settled.inc_by(cost);
    }

    /// Update registration gauges
    pub fn set_registrations(&self, producers: usize, consumers: usize) {
        self.producers.set(producers as i64);
        self.consumers.set(consumers as i64);
    }

    /// Render all metrics in Prometheus text format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
