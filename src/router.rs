// =============================================================================
// Router / System Manager
// =============================================================================
//
// Tracks which analysis backend is active and forwards every unprocessed
// `data_collection_completed` event to exactly that backend. A
// concurrent `switch_mode` call never changes which backend an
// already-started dispatch uses — each event reads the active backend
// once before dispatching.
// =============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use crate::analysis;
use crate::engine::ThreeGateEngine;
use crate::notifier::Notifier;
use crate::types::AnalysisMode;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const POLL_BACKOFF: Duration = Duration::from_secs(10);
const POLL_BATCH_SIZE: i64 = 10;
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Routes `data_collection_completed` events to the active analysis
/// backend. Only the `three_gate` backend is implemented by this core;
/// `legacy` is a recognized mode with no-op dispatch, reserved for a
/// deployment that still runs the prior analysis pipeline alongside this
/// one.
pub struct Router {
    pool: Arc<PgPool>,
    engine: Arc<ThreeGateEngine>,
    notifier: Arc<dyn Notifier>,
    active_mode: RwLock<AnalysisMode>,
}

impl Router {
    pub fn new(
        pool: Arc<PgPool>,
        engine: Arc<ThreeGateEngine>,
        notifier: Arc<dyn Notifier>,
        initial_mode: AnalysisMode,
    ) -> Self {
        Self {
            pool,
            engine,
            notifier,
            active_mode: RwLock::new(initial_mode),
        }
    }

    pub fn active_mode(&self) -> AnalysisMode {
        *self.active_mode.read()
    }

    /// Hot-swap the active backend. The collector is untouched; events
    /// already dispatched under the old mode run to completion, future
    /// events go to the new one.
    pub fn switch_mode(&self, new_mode: AnalysisMode) {
        let mut active = self.active_mode.write();
        if *active != new_mode {
            info!(from = %*active, to = %new_mode, "switching active analysis backend");
            *active = new_mode;
        }
    }

    async fn poll_once(&self) -> anyhow::Result<usize> {
        let events = crate::store::poll_unprocessed_events(&self.pool, POLL_BATCH_SIZE).await?;
        let count = events.len();

        for event in events {
            let mode = self.active_mode();
            match mode {
                AnalysisMode::ThreeGate => {
                    analysis::handle_event(&self.pool, &self.engine, self.notifier.as_ref(), &event)
                        .await;
                }
                AnalysisMode::Legacy => {
                    warn!(event_id = event.id, "legacy backend active; event dispatch is a no-op");
                    if let Err(err) =
                        crate::store::mark_event_processed(&self.pool, event.id, None).await
                    {
                        error!(event_id = event.id, error = %err, "failed to mark legacy-mode event processed");
                    }
                }
            }
        }

        Ok(count)
    }

    /// Probe pool connectivity; logged at `warn` on failure, never
    /// auto-restarted (§4.7).
    async fn health_check(&self) {
        if let Err(err) = sqlx::query("SELECT 1").execute(self.pool.as_ref()).await {
            warn!(error = %err, "router health check: database connectivity failed");
        }
    }
}

/// Run the router's poll loop indefinitely until `shutdown` fires. Polls
/// every `POLL_INTERVAL` under normal operation; on a poll-loop error,
/// backs off to `POLL_BACKOFF` before retrying (§4.7 supplement).
pub async fn run_router_loop(router: Arc<Router>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    info!("router loop started");
    let mut delay = POLL_INTERVAL;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                match router.poll_once().await {
                    Ok(_) => delay = POLL_INTERVAL,
                    Err(err) => {
                        error!(error = %err, "router poll failed; backing off");
                        delay = POLL_BACKOFF;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("router loop shutting down");
                    break;
                }
            }
        }
    }
}

/// Run the 30-second health-check loop indefinitely until `shutdown`
/// fires.
pub async fn run_health_check_loop(
    router: Arc<Router>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = interval(HEALTH_CHECK_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                router.health_check().await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("health check loop shutting down");
                    break;
                }
            }
        }
    }
}
