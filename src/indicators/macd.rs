// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line   = EMA(12) - EMA(26)
// Signal line = EMA(9) of the MACD line
// Histogram   = MACD line - Signal line
//
// Default periods: fast=12, slow=26, signal=9. Grounded on `ema.rs`'s
// EMA implementation; the signal line is just another EMA applied to the
// MACD series.
// =============================================================================

use super::ema::calculate_ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the most recent MACD/signal/histogram triple.
///
/// Returns `None` when there isn't enough history to seed both EMAs and the
/// signal EMA (`slow + signal` closes, minimum).
pub fn calculate_macd(
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdResult> {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || fast_period >= slow_period {
        return None;
    }
    if closes.len() < slow_period + signal_period {
        return None;
    }

    let fast_ema = calculate_ema(closes, fast_period);
    let slow_ema = calculate_ema(closes, slow_period);

    // `calculate_ema` seeds at index `period - 1`, so the two series start
    // at different offsets; align them to the slow series' start.
    let offset = slow_period - fast_period;
    if fast_ema.len() <= offset {
        return None;
    }
    let macd_series: Vec<f64> = fast_ema[offset..]
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();

    if macd_series.len() < signal_period {
        return None;
    }

    let signal_series = calculate_ema(&macd_series, signal_period);
    let signal = *signal_series.last()?;
    let macd = *macd_series.last()?;

    if !macd.is_finite() || !signal.is_finite() {
        return None;
    }

    Some(MacdResult {
        macd,
        signal,
        histogram: macd - signal,
    })
}

/// Standard MACD(12, 26, 9).
pub fn calculate(closes: &[f64]) -> Option<MacdResult> {
    calculate_macd(closes, 12, 26, 9)
}
