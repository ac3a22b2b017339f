//! Energy ledger server binary

use anyhow::Context;
use energy_ledger::{Config, EnergyService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("ENERGY_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => Config::from_env().context("loading config from environment")?,
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        owner = %config.owner,
        "Starting energy ledger"
    );

    let service = EnergyService::open(config).await?;
    let state = service.handle().snapshot().await?;
    tracing::info!(
        producers = state.producers.len(),
        consumers = state.consumers.len(),
        "Ledger opened successfully"
    );

    tokio::signal::ctrl_c().await?;

    tracing::debug!("{}", service.metrics().gather_text());
    service.shutdown().await?;
    Ok(())
}
