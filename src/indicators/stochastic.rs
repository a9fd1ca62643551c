// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
// %K = 100 * (close - lowest_low) / (highest_high - lowest_low), over
//      `k_period` bars.
// %D = SMA(%K, d_period) — a smoothed signal line.
//
// Interpretation: %K/%D > 80 overbought, < 20 oversold.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use super::sma::calculate_sma;
use crate::types::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticResult {
    pub k: f64,
    pub d: f64,
}

/// Compute the most recent %K/%D pair.
///
/// Returns `None` when there are fewer than `k_period + d_period - 1` bars,
/// or the high-low range is degenerate (zero) at every window.
pub fn calculate_stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> Option<StochasticResult> {
    if k_period == 0 || d_period == 0 {
        return None;
    }
    if bars.len() < k_period + d_period - 1 {
        return None;
    }

    let k_series = k_series(bars, k_period)?;
    if k_series.len() < d_period {
        return None;
    }

    let d_series = calculate_sma(&k_series, d_period);
    let k = *k_series.last()?;
    let d = *d_series.last()?;

    if !k.is_finite() || !d.is_finite() {
        return None;
    }

    Some(StochasticResult { k, d })
}

/// Standard Stochastic(14, 3).
pub fn calculate(bars: &[Bar]) -> Option<StochasticResult> {
    calculate_stochastic(bars, 14, 3)
}

fn k_series(bars: &[Bar], k_period: usize) -> Option<Vec<f64>> {
    if bars.len() < k_period {
        return None;
    }

    let mut out = Vec::with_capacity(bars.len() - k_period + 1);
    for window in bars.windows(k_period) {
        let highest = window
            .iter()
            .map(|b| b.high.to_f64().unwrap_or(f64::NAN))
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest = window
            .iter()
            .map(|b| b.low.to_f64().unwrap_or(f64::NAN))
            .fold(f64::INFINITY, f64::min);
        let close = window.last()?.close.to_f64().unwrap_or(f64::NAN);

        let range = highest - lowest;
        let k = if range == 0.0 {
            50.0
        } else {
            100.0 * (close - lowest) / range
        };
        if !k.is_finite() {
            return None;
        }
        out.push(k);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    use crate::types::Timeframe;

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "USDJPY".to_string(),
            timeframe: Timeframe::H1,
            timestamp: Utc::now(),
            open: Decimal::from_f64(close).unwrap(),
            high: Decimal::from_f64(high).unwrap(),
            low: Decimal::from_f64(low).unwrap(),
            close: Decimal::from_f64(close).unwrap(),
            volume: 1,
            source: "test".to_string(),
            quality_score: Decimal::ONE,
        }
    }

    #[test]
    fn stochastic_insufficient_data() {
        let bars = vec![bar(101.0, 99.0, 100.0); 5];
        assert!(calculate_stochastic(&bars, 14, 3).is_none());
    }

    #[test]
    fn stochastic_at_high_of_range_is_100() {
        let mut bars = vec![bar(110.0, 90.0, 100.0); 16];
        let last = bars.len() - 1;
        bars[last] = bar(110.0, 90.0, 110.0);
        let result = calculate_stochastic(&bars, 14, 3).unwrap();
        assert!((result.k - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_degenerate_range_is_midpoint() {
        let bars = vec![bar(100.0, 100.0, 100.0); 20];
        let result = calculate_stochastic(&bars, 14, 3).unwrap();
        assert!((result.k - 50.0).abs() < 1e-9);
        assert!((result.d - 50.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_in_valid_range() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.3).sin() * 5.0;
                bar(base + 1.0, base - 1.0, base)
            })
            .collect();
        let result = calculate(&bars).unwrap();
        assert!((0.0..=100.0).contains(&result.k));
        assert!((0.0..=100.0).contains(&result.d));
    }
}
