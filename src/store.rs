// =============================================================================
// Time-series / Event / Signal Store
// =============================================================================
//
// `PgPool`-backed repository functions for the three persisted tables
// (§6.1, §3.2, §6.4). Every bar upsert detects a genuine insert-or-change
// at the SQL layer via `IS DISTINCT FROM` guards combined with the
// `xmax = 0` trick, so re-collecting unchanged vendor data never reports
// a new row.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{info, warn};

use crate::runtime_config::DatabaseConfig;
use crate::types::{Bar, Event, SignalType, Timeframe, ThreeGateResult};

/// Build a connection pool from `DatabaseConfig`, applying the configured
/// min/max connections and command timeout.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.command_timeout_secs))
        .connect(&config.dsn())
        .await
        .context("failed to acquire database pool")?;

    info!(
        host = %config.host,
        database = %config.database,
        min = config.min_connections,
        max = config.max_connections,
        "database pool established"
    );

    Ok(pool)
}

// =============================================================================
// price_data
// =============================================================================

/// Upsert a single bar. Returns `true` only when the row was newly
/// inserted or an existing row's OHLCV actually changed — re-upserting
/// identical data returns `false`.
pub async fn upsert_bar(pool: &PgPool, bar: &Bar) -> Result<bool> {
    let row: Option<PgRow> = sqlx::query(
        r#"
        INSERT INTO price_data
            (symbol, timeframe, timestamp, open, high, low, close, volume,
             source, data_quality_score, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
        ON CONFLICT (symbol, timeframe, timestamp) DO UPDATE
        SET open = EXCLUDED.open,
            high = EXCLUDED.high,
            low = EXCLUDED.low,
            close = EXCLUDED.close,
            volume = EXCLUDED.volume,
            data_quality_score = EXCLUDED.data_quality_score,
            updated_at = now()
        WHERE price_data.open IS DISTINCT FROM EXCLUDED.open
           OR price_data.high IS DISTINCT FROM EXCLUDED.high
           OR price_data.low IS DISTINCT FROM EXCLUDED.low
           OR price_data.close IS DISTINCT FROM EXCLUDED.close
           OR price_data.volume IS DISTINCT FROM EXCLUDED.volume
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(&bar.symbol)
    .bind(bar.timeframe.as_str())
    .bind(bar.timestamp)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.volume)
    .bind(&bar.source)
    .bind(bar.quality_score)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to upsert bar {} {}", bar.symbol, bar.timeframe))?;

    Ok(row.is_some())
}

/// Fetch the most recent `limit` bars for `symbol`/`timeframe`, oldest
/// first (reversing the `DESC` query result before returning).
pub async fn latest_bars(
    pool: &PgPool,
    symbol: &str,
    timeframe: Timeframe,
    limit: i64,
) -> Result<Vec<Bar>> {
    let rows = sqlx::query(
        r#"
        SELECT symbol, timeframe, timestamp, open, high, low, close, volume,
               source, data_quality_score
        FROM price_data
        WHERE symbol = $1 AND timeframe = $2
        ORDER BY timestamp DESC
        LIMIT $3
        "#,
    )
    .bind(symbol)
    .bind(timeframe.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load bars for {symbol} {timeframe}"))?;

    let mut bars: Vec<Bar> = rows
        .into_iter()
        .map(|row| Bar {
            symbol: row.get("symbol"),
            timeframe,
            timestamp: row.get("timestamp"),
            open: row.get("open"),
            high: row.get("high"),
            low: row.get("low"),
            close: row.get("close"),
            volume: row.get("volume"),
            source: row.get("source"),
            quality_score: row.get("data_quality_score"),
        })
        .collect();

    bars.reverse();
    Ok(bars)
}

/// Timestamp of the most recently stored bar for `symbol`/`timeframe`, if
/// any. Used by the collector to size its incremental fetch window.
pub async fn latest_bar_timestamp(
    pool: &PgPool,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<Option<DateTime<Utc>>> {
    let row = sqlx::query(
        "SELECT MAX(timestamp) AS ts FROM price_data WHERE symbol = $1 AND timeframe = $2",
    )
    .bind(symbol)
    .bind(timeframe.as_str())
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to query latest bar timestamp for {symbol} {timeframe}"))?;

    Ok(row.try_get("ts").ok())
}

// =============================================================================
// events
// =============================================================================

/// Insert a `data_collection_completed` event and return its id.
pub async fn insert_event(pool: &PgPool, symbol: &str, event_data: &Value) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO events (event_type, symbol, event_data, processed, created_at, retry_count)
        VALUES ($1, $2, $3, FALSE, now(), 0)
        RETURNING id
        "#,
    )
    .bind(crate::types::EVENT_TYPE_DATA_COLLECTION_COMPLETED)
    .bind(symbol)
    .bind(event_data)
    .fetch_one(pool)
    .await
    .context("failed to insert data_collection_completed event")?;

    Ok(row.get("id"))
}

/// Fetch up to `limit` unprocessed events, oldest first (§5.3 polling
/// contract).
pub async fn poll_unprocessed_events(pool: &PgPool, limit: i64) -> Result<Vec<Event>> {
    let rows = sqlx::query(
        r#"
        SELECT id, event_type, symbol, event_data, processed, created_at,
               processed_at, error_message, retry_count
        FROM events
        WHERE event_type = $1 AND processed = FALSE
        ORDER BY created_at ASC
        LIMIT $2
        "#,
    )
    .bind(crate::types::EVENT_TYPE_DATA_COLLECTION_COMPLETED)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to poll unprocessed events")?;

    Ok(rows
        .into_iter()
        .map(|row| Event {
            id: row.get("id"),
            event_type: row.get("event_type"),
            symbol: row.get("symbol"),
            event_data: row.get("event_data"),
            processed: row.get("processed"),
            created_at: row.get("created_at"),
            processed_at: row.get("processed_at"),
            error_message: row.get("error_message"),
            retry_count: row.get("retry_count"),
        })
        .collect())
}

/// Mark an event processed. Always sets `processed = true`; on failure
/// also sets `error_message` and bumps `retry_count`. Never leaves an
/// event unprocessed on the error path — per-event errors are terminal,
/// not retried automatically (§7).
pub async fn mark_event_processed(pool: &PgPool, event_id: i64, error: Option<&str>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE events
        SET processed = TRUE,
            processed_at = now(),
            error_message = $2,
            retry_count = retry_count + CASE WHEN $2 IS NOT NULL THEN 1 ELSE 0 END
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .bind(error)
    .execute(pool)
    .await
    .with_context(|| format!("failed to mark event {event_id} processed"))?;

    if result.rows_affected() == 0 {
        warn!(event_id, "mark_event_processed affected zero rows");
    }

    Ok(())
}

// =============================================================================
// three_gate_signals
// =============================================================================

/// Persist an emitted signal. `NEUTRAL` signals must never reach this
/// function — the caller enforces that invariant (§3.5).
pub async fn insert_signal(pool: &PgPool, result: &ThreeGateResult) -> Result<i64> {
    debug_assert_ne!(result.signal_type, SignalType::Neutral);

    let take_profit = serde_json::to_value(result.take_profit.to_vec())
        .context("failed to serialise take_profit levels")?;

    let row = sqlx::query(
        r#"
        INSERT INTO three_gate_signals
            (symbol, signal_type, overall_confidence, entry_price, stop_loss,
             take_profit, gate1_pattern, gate1_confidence, gate2_pattern,
             gate2_confidence, gate3_pattern, gate3_confidence, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
        RETURNING id
        "#,
    )
    .bind(&result.symbol)
    .bind(result.signal_type.to_string())
    .bind(decimal_from_f64(result.overall_confidence))
    .bind(decimal_from_f64(result.entry_price))
    .bind(decimal_from_f64(result.stop_loss))
    .bind(&take_profit)
    .bind(&result.gate1.pattern)
    .bind(decimal_from_f64(result.gate1.confidence))
    .bind(&result.gate2.pattern)
    .bind(decimal_from_f64(result.gate2.confidence))
    .bind(&result.gate3.pattern)
    .bind(decimal_from_f64(result.gate3.confidence))
    .fetch_one(pool)
    .await
    .context("failed to persist three_gate_signals row")?;

    Ok(row.get("id"))
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}
