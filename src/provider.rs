// =============================================================================
// MarketDataProvider capability (§6.2)
// =============================================================================
//
// An opaque, vendor-agnostic source of OHLCV bars. The core never speaks
// HTTP or any vendor protocol directly; it depends only on this trait.
// Concrete implementations (Yahoo Finance, a broker API, a file replay
// fixture) live outside this crate's scope.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Bar, Timeframe};

/// Result of a provider fetch: either a batch of bars, oldest first, or a
/// vendor-side error message. Modeled as a struct rather than
/// `Result<Vec<Bar>, String>` because a failed fetch is a routine,
/// retryable outcome (TransientIO per §7), not necessarily worth
/// propagating as an `Err` up through `?`.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub success: bool,
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn ok(bars: Vec<Bar>) -> Self {
        Self {
            success: true,
            bars,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            bars: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Capability for fetching OHLCV bars from an external vendor.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch all bars for `symbol`/`timeframe` between `start` and `end`
    /// (inclusive), oldest first.
    async fn get_historical(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchOutcome>;

    /// Fetch the most recent bar(s) available for `symbol`/`timeframe`.
    async fn get_latest(&self, symbol: &str, timeframe: Timeframe) -> Result<FetchOutcome>;

    /// Cheap liveness probe; the collector logs but does not halt on a
    /// `false` result (transient vendor blips are expected).
    async fn health_check(&self) -> bool;
}

/// A `MarketDataProvider` that always reports a failed fetch. Lets the
/// binary compose and run the full collector/store/router/analysis
/// pipeline without a concrete vendor client in scope (§6.2) — swap in a
/// real implementation at the call site in `main.rs` for an actual
/// deployment.
pub struct UnconfiguredProvider;

#[async_trait]
impl MarketDataProvider for UnconfiguredProvider {
    async fn get_historical(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<FetchOutcome> {
        Ok(FetchOutcome::failed("no MarketDataProvider configured"))
    }

    async fn get_latest(&self, _symbol: &str, _timeframe: Timeframe) -> Result<FetchOutcome> {
        Ok(FetchOutcome::failed("no MarketDataProvider configured"))
    }

    async fn health_check(&self) -> bool {
        false
    }
}
