// =============================================================================
// Fibonacci Retracement / Extension Levels
// =============================================================================
//
// Levels are derived from the highest high and lowest low over a lookback
// window. Retracements sit inside the swing range, extensions project
// beyond it. The condition evaluator treats each ratio as a separate
// candidate level for `breaks`/`near` style conditions (§4.2).
//
// The swing-point window is tiered per timeframe per the hierarchical
// indicator engine's scheme: each tier lists a few candidate swing
// periods, tried smallest first, and the first that yields enough bars
// wins. 15m carries no tier (it sits outside the engine's big-picture /
// zone / execution hierarchy) and never gets Fibonacci levels.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use crate::types::{Bar, Timeframe};

/// Standard retracement ratios.
pub const RETRACEMENT_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// Standard extension ratios (beyond the swing range).
pub const EXTENSION_RATIOS: [f64; 4] = [1.272, 1.414, 1.618, 2.0];

#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    /// Retracement levels, one per `RETRACEMENT_RATIOS` entry, same order.
    pub retracements: Vec<f64>,
    /// Extension levels, one per `EXTENSION_RATIOS` entry, same order.
    pub extensions: Vec<f64>,
}

/// Compute Fibonacci retracement and extension levels from the swing high
/// and low over the most recent `period` bars.
///
/// Returns `None` on insufficient data or a degenerate (zero-width) range.
pub fn calculate_fibonacci(bars: &[Bar], period: usize) -> Option<FibonacciLevels> {
    if period == 0 || bars.len() < period {
        return None;
    }

    let window = &bars[bars.len() - period..];
    let swing_high = window
        .iter()
        .map(|b| b.high.to_f64().unwrap_or(f64::NAN))
        .fold(f64::NEG_INFINITY, f64::max);
    let swing_low = window
        .iter()
        .map(|b| b.low.to_f64().unwrap_or(f64::NAN))
        .fold(f64::INFINITY, f64::min);

    if !swing_high.is_finite() || !swing_low.is_finite() || swing_high <= swing_low {
        return None;
    }

    let range = swing_high - swing_low;

    // Retracement measured down from the swing high, toward the low.
    let retracements = RETRACEMENT_RATIOS
        .iter()
        .map(|ratio| swing_high - range * ratio)
        .collect();

    // Extension measured up from the swing high, beyond the range.
    let extensions = EXTENSION_RATIOS
        .iter()
        .map(|ratio| swing_low + range * ratio)
        .collect();

    Some(FibonacciLevels {
        swing_high,
        swing_low,
        retracements,
        extensions,
    })
}

/// Swing-period tier for a timeframe, smallest period first, per the
/// indicator engine's big-picture / zone / execution hierarchy. Empty
/// for timeframes the hierarchy doesn't cover (15m sits between the
/// zone and execution tiers and is left out, matching the original).
pub fn swing_periods_for_timeframe(timeframe: Timeframe) -> &'static [usize] {
    match timeframe {
        Timeframe::D1 => &[20, 50, 100],
        Timeframe::H4 => &[10, 20, 40],
        Timeframe::H1 => &[5, 10, 20],
        Timeframe::M5 => &[3, 5, 10],
        Timeframe::M15 => &[],
    }
}

/// Compute Fibonacci levels for a timeframe's swing-period tier, trying
/// each configured period in order and using the first one with enough
/// bars to form a non-degenerate swing range.
pub fn calculate_fibonacci_tiered(bars: &[Bar], periods: &[usize]) -> Option<FibonacciLevels> {
    periods.iter().find_map(|&period| calculate_fibonacci(bars, period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    use crate::types::Timeframe;

    fn bar(high: f64, low: f64) -> Bar {
        Bar {
            symbol: "USDJPY".to_string(),
            timeframe: Timeframe::H1,
            timestamp: Utc::now(),
            open: Decimal::from_f64((high + low) / 2.0).unwrap(),
            high: Decimal::from_f64(high).unwrap(),
            low: Decimal::from_f64(low).unwrap(),
            close: Decimal::from_f64((high + low) / 2.0).unwrap(),
            volume: 1,
            source: "test".to_string(),
            quality_score: Decimal::ONE,
        }
    }

    #[test]
    fn fibonacci_insufficient_data() {
        let bars = vec![bar(110.0, 90.0); 3];
        assert!(calculate_fibonacci(&bars, 10).is_none());
    }

    #[test]
    fn fibonacci_degenerate_range_is_none() {
        let bars = vec![bar(100.0, 100.0); 10];
        assert!(calculate_fibonacci(&bars, 10).is_none());
    }

    #[test]
    fn fibonacci_levels_between_low_and_high() {
        let bars = vec![bar(110.0, 90.0); 10];
        let fib = calculate_fibonacci(&bars, 10).unwrap();
        assert_eq!(fib.swing_high, 110.0);
        assert_eq!(fib.swing_low, 90.0);
        for level in &fib.retracements {
            assert!((90.0..=110.0).contains(level), "retracement {level} out of range");
        }
        for level in &fib.extensions {
            assert!(*level > 110.0, "extension {level} should exceed swing high");
        }
    }

    #[test]
    fn fibonacci_50_percent_is_midpoint() {
        let bars = vec![bar(200.0, 100.0); 10];
        let fib = calculate_fibonacci(&bars, 10).unwrap();
        let idx = RETRACEMENT_RATIOS.iter().position(|&r| r == 0.5).unwrap();
        assert!((fib.retracements[idx] - 150.0).abs() < 1e-9);
    }

    #[test]
    fn tiered_falls_through_to_larger_period() {
        let bars = vec![bar(110.0, 90.0); 20];
        // 1h tier is [5, 10, 20]; 20 bars isn't enough for a 20-bar window
        // after the first two succeed, so the smallest period wins.
        let fib = calculate_fibonacci_tiered(&bars, swing_periods_for_timeframe(Timeframe::H1)).unwrap();
        assert_eq!(fib.swing_high, 110.0);

        let bars = vec![bar(110.0, 90.0); 7];
        // Only the 5-bar period fits; 10 and 20 don't.
        let fib = calculate_fibonacci_tiered(&bars, swing_periods_for_timeframe(Timeframe::H1)).unwrap();
        assert_eq!(fib.swing_low, 90.0);
    }

    #[test]
    fn fifteen_minute_timeframe_has_no_tier() {
        assert!(swing_periods_for_timeframe(Timeframe::M15).is_empty());
        let bars = vec![bar(110.0, 90.0); 300];
        assert!(calculate_fibonacci_tiered(&bars, swing_periods_for_timeframe(Timeframe::M15)).is_none());
    }
}
