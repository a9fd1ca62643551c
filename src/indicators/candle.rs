// =============================================================================
// Candle Shape Metrics
// =============================================================================
//
// Decomposes a single bar into body / upper-shadow / lower-shadow lengths
// and a bullish/bearish flag. The condition evaluator also needs the
// previous bar's shape for one-bar-lag conditions (e.g. engulfing
// patterns), so `calculate_candle_shape_series` returns the full series
// and callers index back one position themselves.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use crate::types::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleShape {
    pub body: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
    pub bullish: bool,
    pub bearish: bool,
}

/// Decompose a single bar into its shape metrics.
pub fn calculate_candle_shape(bar: &Bar) -> Option<CandleShape> {
    let open = bar.open.to_f64()?;
    let high = bar.high.to_f64()?;
    let low = bar.low.to_f64()?;
    let close = bar.close.to_f64()?;

    if !(open.is_finite() && high.is_finite() && low.is_finite() && close.is_finite()) {
        return None;
    }

    let body = (close - open).abs();
    let upper_shadow = high - open.max(close);
    let lower_shadow = open.min(close) - low;

    Some(CandleShape {
        body,
        upper_shadow: upper_shadow.max(0.0),
        lower_shadow: lower_shadow.max(0.0),
        bullish: close > open,
        bearish: close < open,
    })
}

/// Shape metrics for every bar in the slice, oldest first. Bars that fail
/// to convert to `f64` are skipped (their index is absent from the output,
/// so callers must not assume `series.len() == bars.len()`).
pub fn calculate_candle_shape_series(bars: &[Bar]) -> Vec<CandleShape> {
    bars.iter().filter_map(calculate_candle_shape).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    use crate::types::Timeframe;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "USDJPY".to_string(),
            timeframe: Timeframe::H1,
            timestamp: Utc::now(),
            open: Decimal::from_f64(open).unwrap(),
            high: Decimal::from_f64(high).unwrap(),
            low: Decimal::from_f64(low).unwrap(),
            close: Decimal::from_f64(close).unwrap(),
            volume: 1,
            source: "test".to_string(),
            quality_score: Decimal::ONE,
        }
    }

    #[test]
    fn bullish_candle() {
        let shape = calculate_candle_shape(&bar(100.0, 105.0, 99.0, 104.0)).unwrap();
        assert!(shape.bullish);
        assert!(!shape.bearish);
        assert!((shape.body - 4.0).abs() < 1e-9);
        assert!((shape.upper_shadow - 1.0).abs() < 1e-9);
        assert!((shape.lower_shadow - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bearish_candle() {
        let shape = calculate_candle_shape(&bar(104.0, 105.0, 99.0, 100.0)).unwrap();
        assert!(shape.bearish);
        assert!(!shape.bullish);
    }

    #[test]
    fn doji_has_zero_body() {
        let shape = calculate_candle_shape(&bar(100.0, 102.0, 98.0, 100.0)).unwrap();
        assert_eq!(shape.body, 0.0);
        assert!(!shape.bullish);
        assert!(!shape.bearish);
    }

    #[test]
    fn shadows_never_negative() {
        // open == high, close == low: no upper shadow, no lower shadow beyond body.
        let shape = calculate_candle_shape(&bar(100.0, 100.0, 95.0, 95.0)).unwrap();
        assert_eq!(shape.upper_shadow, 0.0);
        assert_eq!(shape.lower_shadow, 0.0);
    }

    #[test]
    fn series_skips_bars_in_order() {
        let bars = vec![
            bar(100.0, 102.0, 98.0, 101.0),
            bar(101.0, 103.0, 99.0, 102.0),
        ];
        let series = calculate_candle_shape_series(&bars);
        assert_eq!(series.len(), 2);
        assert!(series[0].bullish);
        assert!(series[1].bullish);
    }
}
