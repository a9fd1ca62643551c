// =============================================================================
// Volume-based indicators: SMA, ratio, On-Balance Volume
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use super::sma::calculate_sma;
use crate::types::Bar;

/// Simple moving average of volume over `period` bars.
pub fn calculate_volume_sma(bars: &[Bar], period: usize) -> Option<f64> {
    if bars.len() < period {
        return None;
    }
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    calculate_sma(&volumes, period).last().copied()
}

/// Ratio of the most recent bar's volume to the `period`-bar volume SMA.
/// Values above 1.0 indicate above-average participation.
pub fn calculate_volume_ratio(bars: &[Bar], period: usize) -> Option<f64> {
    let avg = calculate_volume_sma(bars, period)?;
    if avg == 0.0 {
        return None;
    }
    let last_volume = bars.last()?.volume as f64;
    Some(last_volume / avg)
}

/// On-Balance Volume: running total that adds volume on up closes and
/// subtracts it on down closes. Returns the cumulative series, oldest first.
pub fn calculate_obv(bars: &[Bar]) -> Vec<f64> {
    if bars.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    out.push(obv);

    for i in 1..bars.len() {
        let close = bars[i].close.to_f64().unwrap_or(f64::NAN);
        let prev_close = bars[i - 1].close.to_f64().unwrap_or(f64::NAN);
        let volume = bars[i].volume as f64;

        if close > prev_close {
            obv += volume;
        } else if close < prev_close {
            obv -= volume;
        }
        out.push(obv);
    }

    out
}

/// Most recent OBV value.
pub fn current_obv(bars: &[Bar]) -> Option<f64> {
    calculate_obv(bars).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::types::Timeframe;

    fn bar(close: f64, volume: i64) -> Bar {
        Bar {
            symbol: "USDJPY".to_string(),
            timeframe: Timeframe::H1,
            timestamp: Utc::now(),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::new((close * 10000.0) as i64, 4),
            volume,
            source: "test".to_string(),
            quality_score: Decimal::ONE,
        }
    }

    #[test]
    fn volume_sma_insufficient_data() {
        let bars = vec![bar(100.0, 1000); 2];
        assert!(calculate_volume_sma(&bars, 5).is_none());
    }

    #[test]
    fn volume_ratio_above_average() {
        let mut bars = vec![bar(100.0, 1000); 10];
        *bars.last_mut().unwrap() = bar(100.0, 3000);
        let ratio = calculate_volume_ratio(&bars, 10).unwrap();
        assert!(ratio > 1.0, "expected ratio above 1.0, got {ratio}");
    }

    #[test]
    fn obv_empty_input() {
        assert!(calculate_obv(&[]).is_empty());
    }

    #[test]
    fn obv_accumulates_on_up_closes() {
        let bars = vec![bar(100.0, 500), bar(101.0, 300), bar(102.0, 200)];
        let obv = calculate_obv(&bars);
        assert_eq!(obv, vec![0.0, 300.0, 500.0]);
    }

    #[test]
    fn obv_subtracts_on_down_closes() {
        let bars = vec![bar(100.0, 500), bar(99.0, 300)];
        let obv = calculate_obv(&bars);
        assert_eq!(obv, vec![0.0, -300.0]);
    }

    #[test]
    fn obv_unchanged_on_flat_close() {
        let bars = vec![bar(100.0, 500), bar(100.0, 300)];
        let obv = calculate_obv(&bars);
        assert_eq!(obv, vec![0.0, 0.0]);
    }
}
