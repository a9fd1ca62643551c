// =============================================================================
// Three-Gate Engine — Main Entry Point
// =============================================================================
//
// Composes one shared DB pool, the collector loop, the router loop, and a
// 30s health-check loop as concurrently spawned Tokio tasks. Shuts down
// gracefully on Ctrl-C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod collector;
mod condition;
mod engine;
mod indicators;
mod notifier;
mod patterns;
mod provider;
mod router;
mod runtime_config;
mod snapshot;
mod store;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::engine::ThreeGateEngine;
use crate::notifier::LoggingNotifier;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;

const RUNTIME_CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let config = RuntimeConfig::load(RUNTIME_CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load runtime config, using defaults");
        RuntimeConfig::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.tracing_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(symbol = %config.symbol, analysis_mode = %config.analysis_mode, "three-gate engine starting up");

    let pool = Arc::new(store::connect(&config.database).await?);

    let three_gate_engine = Arc::new(ThreeGateEngine::new(
        config.config_dir.clone(),
        config.engine.min_confidence,
        config.engine.min_signal_interval_minutes,
        config.engine.disable_rate_limit,
    ));
    let notifier = Arc::new(LoggingNotifier);
    let router = Arc::new(Router::new(
        Arc::clone(&pool),
        Arc::clone(&three_gate_engine),
        notifier,
        config.analysis_mode,
    ));

    // No concrete vendor integration is in scope for this core (§6.2); a
    // real deployment supplies its own `MarketDataProvider` here. The
    // collector loop is still composed so the rest of the pipeline
    // (store, router, analysis) runs end to end against it.
    let provider: Arc<dyn provider::MarketDataProvider> = Arc::new(provider::UnconfiguredProvider);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let collector_handle = tokio::spawn(collector::run_collector_loop(
        Arc::clone(&pool),
        provider,
        config.symbol.clone(),
        config.collection_interval_minutes,
        shutdown_rx.clone(),
    ));
    let router_handle = tokio::spawn(router::run_router_loop(Arc::clone(&router), shutdown_rx.clone()));
    let health_handle = tokio::spawn(router::run_health_check_loop(router, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping loops");
    let _ = shutdown_tx.send(true);

    if let Err(e) = config.save(RUNTIME_CONFIG_PATH) {
        error!(error = %e, "failed to save runtime config on shutdown");
    }

    let _ = tokio::join!(collector_handle, router_handle, health_handle);
    info!("three-gate engine stopped");
    Ok(())
}
