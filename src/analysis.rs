// =============================================================================
// Analysis Service
// =============================================================================
//
// Reacts to a `data_collection_completed` event: rebuilds the indicator
// snapshot for every timeframe from the store, runs the three-gate
// engine, and persists + notifies on a signal. Every outcome — success,
// handled error, or unexpected failure — results in the event being
// marked processed; none are left stranded.
// =============================================================================

use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::engine::ThreeGateEngine;
use crate::notifier::Notifier;
use crate::snapshot::{populate_timeframe, IndicatorSnapshot, MIN_LOOKBACK_BARS};
use crate::store;
use crate::types::{NotificationPayload, Timeframe};

/// Process one collection-completed signal for `symbol`. `new_data_count`
/// is the `total_new_records` field from the event payload; a count of
/// zero is a no-op (§4.6).
pub async fn process_data_collection_event(
    pool: &PgPool,
    engine: &ThreeGateEngine,
    notifier: &dyn Notifier,
    symbol: &str,
    new_data_count: i64,
) -> anyhow::Result<()> {
    if new_data_count == 0 {
        return Ok(());
    }

    let snapshot = build_snapshot(pool, symbol).await?;
    let Some(result) = engine.evaluate(symbol, &snapshot) else {
        return Ok(());
    };

    store::insert_signal(pool, &result).await?;
    let payload = NotificationPayload::from(&result);
    if !notifier.notify(&payload).await {
        warn!(symbol, "notifier reported delivery failure");
    }

    info!(
        symbol,
        signal_type = %result.signal_type,
        confidence = result.overall_confidence,
        "signal persisted and notified"
    );
    Ok(())
}

async fn build_snapshot(pool: &PgPool, symbol: &str) -> anyhow::Result<IndicatorSnapshot> {
    let mut snapshot = IndicatorSnapshot::new();
    // 1d/4h/1h/5m only — 15m is scoped to the collector's own cycle, not
    // the snapshot the three-gate engine evaluates against (§4.6).
    for timeframe in Timeframe::FALLBACK_ORDER {
        let bars = store::latest_bars(pool, symbol, timeframe, MIN_LOOKBACK_BARS as i64).await?;
        if bars.len() < MIN_LOOKBACK_BARS {
            warn!(
                symbol,
                %timeframe,
                count = bars.len(),
                required = MIN_LOOKBACK_BARS,
                "insufficient history for timeframe; indicators needing more bars will be absent"
            );
        }
        populate_timeframe(&mut snapshot, timeframe, &bars);
    }
    Ok(snapshot)
}

/// Drive one event through `process_data_collection_event`, always
/// marking it processed regardless of outcome (§4.6, §7 "never strand an
/// event").
pub async fn handle_event(
    pool: &PgPool,
    engine: &ThreeGateEngine,
    notifier: &dyn Notifier,
    event: &crate::types::Event,
) {
    let new_data_count = event
        .event_data
        .get("total_new_records")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let outcome =
        process_data_collection_event(pool, engine, notifier, &event.symbol, new_data_count).await;

    let error_message = match &outcome {
        Ok(()) => None,
        Err(err) => {
            error!(event_id = event.id, symbol = %event.symbol, error = %err, "analysis failed for event");
            Some(err.to_string())
        }
    };

    if let Err(err) = store::mark_event_processed(pool, event.id, error_message.as_deref()).await {
        error!(event_id = event.id, error = %err, "failed to mark event processed");
    }
}
