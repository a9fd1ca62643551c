// =============================================================================
// Collector
// =============================================================================
//
// Runs on a fixed schedule, fetching each configured timeframe's latest
// bars from the vendor provider, upserting them, and emitting one
// `data_collection_completed` event per cycle when anything new landed.
// Loop shape: a ticker plus graceful shutdown via a watch channel.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::provider::MarketDataProvider;
use crate::snapshot::MIN_LOOKBACK_BARS;
use crate::store;
use crate::types::{DataCollectionEventPayload, Timeframe, TimeframeCollectionDetail};

/// Minimum pause between per-timeframe vendor calls, to respect vendor
/// rate limits (§4.5).
const INTER_TIMEFRAME_DELAY: Duration = Duration::from_secs(1);

/// Approximate native cadence of each timeframe, used to size the wide
/// bootstrap fetch window on a fresh deployment (`MIN_LOOKBACK_BARS`
/// bars back, at the timeframe's own cadence).
fn bootstrap_window(timeframe: Timeframe) -> ChronoDuration {
    let minutes = match timeframe {
        Timeframe::M5 => 5,
        Timeframe::M15 => 15,
        Timeframe::H1 => 60,
        Timeframe::H4 => 240,
        Timeframe::D1 => 60 * 24,
    };
    ChronoDuration::minutes(minutes * MIN_LOOKBACK_BARS as i64)
}

/// Run one collection cycle for `symbol` across every configured
/// timeframe, returning the total count of genuinely new/changed bars.
pub async fn run_cycle(
    pool: &PgPool,
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> BTreeMap<Timeframe, TimeframeCollectionDetail> {
    let mut details = BTreeMap::new();

    for (i, timeframe) in Timeframe::ALL.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(INTER_TIMEFRAME_DELAY).await;
        }

        match collect_timeframe(pool, provider, symbol, timeframe).await {
            Ok(Some(detail)) => {
                details.insert(timeframe, detail);
            }
            Ok(None) => {
                debug!(symbol, %timeframe, "no new bars this cycle");
            }
            Err(err) => {
                error!(symbol, %timeframe, error = %err, "collection failed for timeframe");
            }
        }
    }

    details
}

async fn collect_timeframe(
    pool: &PgPool,
    provider: &dyn MarketDataProvider,
    symbol: &str,
    timeframe: Timeframe,
) -> anyhow::Result<Option<TimeframeCollectionDetail>> {
    let latest = store::latest_bar_timestamp(pool, symbol, timeframe).await?;
    let now = Utc::now();

    let start = match latest {
        Some(ts) => ts + ChronoDuration::minutes(1),
        None => {
            info!(symbol, %timeframe, "no prior history, performing wide bootstrap fetch");
            now - bootstrap_window(timeframe)
        }
    };

    if start >= now {
        return Ok(None);
    }

    let outcome = provider.get_historical(symbol, timeframe, start, now).await?;
    if !outcome.success {
        warn!(symbol, %timeframe, error = ?outcome.error, "vendor fetch failed");
        return Ok(None);
    }

    let mut new_records = 0i64;
    let mut latest_timestamp: Option<DateTime<Utc>> = None;

    for bar in &outcome.bars {
        if store::upsert_bar(pool, bar).await? {
            new_records += 1;
        }
        latest_timestamp = Some(latest_timestamp.map_or(bar.timestamp, |t| t.max(bar.timestamp)));
    }

    if new_records == 0 {
        return Ok(None);
    }

    Ok(Some(TimeframeCollectionDetail {
        new_records,
        latest_timestamp: latest_timestamp.unwrap_or(now),
    }))
}

/// Build and persist the `data_collection_completed` event for one
/// cycle's results, if anything new landed.
async fn emit_event_if_any(
    pool: &PgPool,
    symbol: &str,
    details: &BTreeMap<Timeframe, TimeframeCollectionDetail>,
) -> anyhow::Result<()> {
    let total_new_records: i64 = details.values().map(|d| d.new_records).sum();
    if total_new_records == 0 {
        return Ok(());
    }

    let timeframes = details
        .iter()
        .map(|(tf, detail)| (tf.as_str().to_string(), detail.clone()))
        .collect();

    let payload = DataCollectionEventPayload {
        symbol: symbol.to_string(),
        timeframes,
        total_new_records,
        timestamp: Utc::now(),
        daemon_type: "standalone".to_string(),
    };

    let event_data = serde_json::to_value(&payload)?;
    let event_id = store::insert_event(pool, symbol, &event_data).await?;
    info!(symbol, event_id, total_new_records, "data_collection_completed event emitted");
    Ok(())
}

/// Run the collector indefinitely, ticking every `interval_minutes`
/// minutes, until `shutdown` fires. Cancellable via a `tokio::select!`
/// against a shared shutdown watch.
pub async fn run_collector_loop(
    pool: Arc<PgPool>,
    provider: Arc<dyn MarketDataProvider>,
    symbol: String,
    interval_minutes: u32,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    info!(symbol = %symbol, interval_minutes, "collector loop started");
    let mut ticker = interval(Duration::from_secs(interval_minutes.max(1) as u64 * 60));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let details = run_cycle(&pool, provider.as_ref(), &symbol).await;
                if let Err(err) = emit_event_if_any(&pool, &symbol, &details).await {
                    error!(symbol = %symbol, error = %err, "failed to emit collection event");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("collector loop shutting down");
                    break;
                }
            }
        }
    }
}
