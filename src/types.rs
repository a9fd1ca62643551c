// =============================================================================
// Core Domain Types — Bars, Events, Gate Results, Signals
// =============================================================================
//
// These are the shared value types every component (store, collector,
// analysis service, three-gate engine) passes around. None of them carry
// behaviour beyond small derivations; the orchestration logic lives in the
// modules that consume them (`engine`, `collector`, `analysis`, `router`).
// =============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Timeframe
// =============================================================================

/// One of the five candle durations the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// All timeframes the collector cycles through, in collection order.
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// The fixed fallback search order used by the condition evaluator
    /// (§4.2) and by entry/ATR resolution (§4.3.6). Must be preserved
    /// verbatim — this ordering is load-bearing for scoring determinism.
    pub const FALLBACK_ORDER: [Timeframe; 4] =
        [Timeframe::D1, Timeframe::H4, Timeframe::H1, Timeframe::M5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Timeframe> {
        match s {
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Bar (OHLCV)
// =============================================================================

/// A single OHLCV candle for `(symbol, timeframe, timestamp)`.
///
/// `(symbol, timeframe, timestamp)` is the unique key in `price_data` (§6.1).
/// `low <= open, close <= high` is the well-formedness criterion; violations
/// attenuate `quality_score` rather than rejecting the row (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub source: String,
    pub quality_score: Decimal,
}

impl Bar {
    /// Construct a bar with `source = "yahoo_finance"` and `quality_score`
    /// derived from the well-formedness check (§3.1, P1).
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        let well_formed = low <= open && open <= high && low <= close && close <= high;
        Self {
            symbol: symbol.into(),
            timeframe,
            timestamp,
            open,
            high,
            low,
            close,
            volume: volume.max(0),
            source: "yahoo_finance".to_string(),
            quality_score: if well_formed { Decimal::ONE } else { Decimal::new(5, 1) },
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}

// =============================================================================
// Event
// =============================================================================

/// The only event type the core emits/consumes (§3.2).
pub const EVENT_TYPE_DATA_COLLECTION_COMPLETED: &str = "data_collection_completed";

/// A durable row in the `events` table coordinating collector -> router ->
/// analysis service. Immutable except for `processed`, `processed_at`,
/// `error_message`, `retry_count` (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub symbol: String,
    pub event_data: Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
}

/// Per-timeframe detail inside a `data_collection_completed` payload (§6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeCollectionDetail {
    pub new_records: i64,
    pub latest_timestamp: DateTime<Utc>,
}

/// The structured `event_data` payload for `data_collection_completed` (§6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCollectionEventPayload {
    pub symbol: String,
    pub timeframes: std::collections::BTreeMap<String, TimeframeCollectionDetail>,
    pub total_new_records: i64,
    pub timestamp: DateTime<Utc>,
    pub daemon_type: String,
}

// =============================================================================
// Gate / Signal results
// =============================================================================

/// Result of evaluating one gate (§3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub valid: bool,
    pub pattern: String,
    pub confidence: f64,
    pub passed_conditions: Vec<String>,
    pub failed_conditions: Vec<String>,
    pub additional_data: serde_json::Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl GateResult {
    pub fn invalid(pattern: impl Into<String>) -> Self {
        Self {
            valid: false,
            pattern: pattern.into(),
            confidence: 0.0,
            passed_conditions: Vec::new(),
            failed_conditions: Vec::new(),
            additional_data: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// The Gate 1 environment this result propagates forward, if any
    /// (`gate1_environment` key, §4.3.3).
    pub fn gate1_environment(&self) -> Option<&str> {
        self.additional_data.get("gate1_environment").and_then(|v| v.as_str())
    }
}

/// BUY / SELL / NEUTRAL direction of an emitted signal (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Neutral => "NEUTRAL",
        };
        write!(f, "{s}")
    }
}

/// The final three-gate evaluation result (§3.5). `Neutral` results are
/// never persisted as signals (invariant, enforced by the caller).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreeGateResult {
    pub symbol: String,
    pub gate1: GateResult,
    pub gate2: GateResult,
    pub gate3: GateResult,
    pub overall_confidence: f64,
    pub signal_type: SignalType,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: [f64; 3],
    pub timestamp: DateTime<Utc>,
}

impl ThreeGateResult {
    /// Risk in price units (§3.5, R-unit definition in the glossary).
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Reward to the first take-profit level.
    pub fn reward(&self) -> f64 {
        (self.take_profit[0] - self.entry_price).abs()
    }

    pub fn risk_reward_ratio(&self) -> f64 {
        let risk = self.risk();
        if risk > 0.0 {
            self.reward() / risk
        } else {
            0.0
        }
    }
}

// =============================================================================
// Analysis mode (active backend)
// =============================================================================

/// Which analysis backend the router dispatches events to (§4.7, §6.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Legacy,
    ThreeGate,
}

impl Default for AnalysisMode {
    fn default() -> Self {
        AnalysisMode::ThreeGate
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisMode::Legacy => "legacy",
            AnalysisMode::ThreeGate => "three_gate",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// Notification payload (§6.3)
// =============================================================================

/// The structured payload handed to the outbound `Notifier` capability.
/// Field set is grounded on the original Discord notifier's embed fields
/// (confidence, entry/SL/TP, risk/reward, per-gate patterns).
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub symbol: String,
    pub signal_type: SignalType,
    pub overall_confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: [f64; 3],
    pub risk: f64,
    pub reward: f64,
    pub risk_reward_ratio: f64,
    pub gate1_pattern: String,
    pub gate1_confidence: f64,
    pub gate2_pattern: String,
    pub gate2_confidence: f64,
    pub gate3_pattern: String,
    pub gate3_confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&ThreeGateResult> for NotificationPayload {
    fn from(r: &ThreeGateResult) -> Self {
        Self {
            symbol: r.symbol.clone(),
            signal_type: r.signal_type,
            overall_confidence: r.overall_confidence,
            entry_price: r.entry_price,
            stop_loss: r.stop_loss,
            take_profit: r.take_profit,
            risk: r.risk(),
            reward: r.reward(),
            risk_reward_ratio: r.risk_reward_ratio(),
            gate1_pattern: r.gate1.pattern.clone(),
            gate1_confidence: r.gate1.confidence,
            gate2_pattern: r.gate2.pattern.clone(),
            gate2_confidence: r.gate2.confidence,
            gate3_pattern: r.gate3.pattern.clone(),
            gate3_confidence: r.gate3.confidence,
            timestamp: r.timestamp,
        }
    }
}
