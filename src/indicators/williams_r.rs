// =============================================================================
// Williams %R
// =============================================================================
//
// %R = -100 * (highest_high - close) / (highest_high - lowest_low), over
//      `period` bars. Inverted Stochastic scale: 0 to -100, with
//      -20..0 overbought and -100..-80 oversold.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use crate::types::Bar;

/// Compute the most recent Williams %R value.
///
/// Returns `None` on insufficient data or a degenerate (zero-width) range.
pub fn calculate_williams_r(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }

    let window = &bars[bars.len() - period..];
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
    let r = if range == 0.0 {
        -50.0
    } else {
        -100.0 * (highest - close) / range
    };

    if r.is_finite() {
        Some(r)
    } else {
        None
    }
}

/// Standard Williams %R(14).
pub fn calculate(bars: &[Bar]) -> Option<f64> {
    calculate_williams_r(bars, 14)
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
    fn williams_r_insufficient_data() {
        let bars = vec![bar(101.0, 99.0, 100.0); 5];
        assert!(calculate_williams_r(&bars, 14).is_none());
    }

    #[test]
    fn williams_r_at_high_is_zero() {
        let mut bars = vec![bar(110.0, 90.0, 100.0); 13];
        bars.push(bar(110.0, 90.0, 110.0));
        let r = calculate_williams_r(&bars, 14).unwrap();
        assert!(r.abs() < 1e-9, "expected ~0 at the high, got {r}");
    }

    #[test]
    fn williams_r_at_low_is_minus_100() {
        let mut bars = vec![bar(110.0, 90.0, 100.0); 13];
        bars.push(bar(110.0, 90.0, 90.0));
        let r = calculate_williams_r(&bars, 14).unwrap();
        assert!((r + 100.0).abs() < 1e-9, "expected ~-100 at the low, got {r}");
    }

    #[test]
    fn williams_r_degenerate_range_is_midpoint() {
        let bars = vec![bar(100.0, 100.0, 100.0); 14];
        let r = calculate_williams_r(&bars, 14).unwrap();
        assert!((r + 50.0).abs() < 1e-9);
    }

    #[test]
    fn williams_r_always_in_valid_range() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.4).sin() * 5.0;
                bar(base + 1.0, base - 1.0, base)
            })
            .collect();
        let r = calculate(&bars).unwrap();
        assert!((-100.0..=0.0).contains(&r));
    }
}
