// =============================================================================
// Average Directional Index (ADX) and ADX Rating (ADXR)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Apply Wilder's smoothing (period) to +DM, -DM, and TR.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = Wilder's smoothed average of DX over `period` bars.
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
//
// ADXR = (ADX_today + ADX_n_periods_ago) / 2, used to dampen single-period
// spikes when Gate 1 classifies trend strength.
// =============================================================================

use rust_decimal::prelude::ToPrimitive;

use crate::types::Bar;

fn hlc(bar: &Bar) -> (f64, f64, f64) {
    (
        bar.high.to_f64().unwrap_or(f64::NAN),
        bar.low.to_f64().unwrap_or(f64::NAN),
        bar.close.to_f64().unwrap_or(f64::NAN),
    )
}

/// Compute the most recent ADX value from a slice of bars (oldest first).
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than `2 * period + 1` bars (we need `period` bars for
///   the initial Wilder's smoothing **and** another `period` DX values to
///   seed the ADX average).
/// - Any intermediate calculation produces a non-finite result.
pub fn calculate_adx(bars: &[Bar], period: usize) -> Option<f64> {
    let series = adx_series(bars, period)?;
    series.last().copied()
}

/// ADXR: average of the current ADX and the ADX from `period` bars earlier.
/// Returns `None` if either ADX value is unavailable.
pub fn calculate_adxr(bars: &[Bar], period: usize) -> Option<f64> {
    let series = adx_series(bars, period)?;
    if series.len() <= period {
        return None;
    }
    let current = *series.last()?;
    let prior = series[series.len() - 1 - period];
    let adxr = (current + prior) / 2.0;
    if adxr.is_finite() {
        Some(adxr)
    } else {
        None
    }
}

/// Full series of ADX values (one per DX value after the seed), oldest
/// first. Internal helper shared by `calculate_adx` and `calculate_adxr`.
fn adx_series(bars: &[Bar], period: usize) -> Option<Vec<f64>> {
    if period == 0 {
        return None;
    }

    let min_bars = 2 * period + 1;
    if bars.len() < min_bars {
        return None;
    }

    let period_f = period as f64;

    let n = bars.len();
    let bar_count = n - 1;

    let mut plus_dm = Vec::with_capacity(bar_count);
    let mut minus_dm = Vec::with_capacity(bar_count);
    let mut tr_vals = Vec::with_capacity(bar_count);

    for i in 1..n {
        let (high, low, _) = hlc(&bars[i]);
        let (prev_high, prev_low, prev_close) = hlc(&bars[i - 1]);

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        let up_move = high - prev_high;
        let down_move = prev_low - low;

        let pdm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let mdm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        plus_dm.push(pdm);
        minus_dm.push(mdm);
        tr_vals.push(tr);
    }

    let mut smooth_plus_dm: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus_dm: f64 = minus_dm[..period].iter().sum();
    let mut smooth_tr: f64 = tr_vals[..period].iter().sum();

    let mut dx_values: Vec<f64> = Vec::with_capacity(bar_count - period + 1);

    if let Some(dx) = compute_dx(smooth_plus_dm, smooth_minus_dm, smooth_tr) {
        dx_values.push(dx);
    } else {
        return None;
    }

    for i in period..bar_count {
        smooth_plus_dm = smooth_plus_dm - smooth_plus_dm / period_f + plus_dm[i];
        smooth_minus_dm = smooth_minus_dm - smooth_minus_dm / period_f + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[i];

        if let Some(dx) = compute_dx(smooth_plus_dm, smooth_minus_dm, smooth_tr) {
            dx_values.push(dx);
        } else {
            return None;
        }
    }

    if dx_values.len() < period {
        return None;
    }

    let adx_seed: f64 = dx_values[..period].iter().sum::<f64>() / period_f;
    if !adx_seed.is_finite() {
        return None;
    }

    let mut adx_values = Vec::with_capacity(dx_values.len() - period + 1);
    let mut adx = adx_seed;
    adx_values.push(adx);
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
        if !adx.is_finite() {
            return None;
        }
        adx_values.push(adx);
    }

    Some(adx_values)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Compute DX from smoothed +DM, -DM, and TR values.
///
/// Returns `None` if the divisor is zero or the result is non-finite.
fn compute_dx(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<f64> {
    if smooth_tr == 0.0 {
        return None;
    }

    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;

    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        return Some(0.0);
    }

    let dx = ((plus_di - minus_di).abs() / di_sum) * 100.0;

    if dx.is_finite() {
        Some(dx)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
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
    fn adx_period_zero() {
        let bars = vec![bar(1.0, 2.0, 0.5, 1.5); 50];
        assert!(calculate_adx(&bars, 0).is_none());
    }

    #[test]
    fn adx_insufficient_data() {
        let bars = vec![bar(1.0, 2.0, 0.5, 1.5); 10];
        assert!(calculate_adx(&bars, 14).is_none());
    }

    #[test]
    fn adx_strong_uptrend() {
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                bar(base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect();

        let adx = calculate_adx(&bars, 14);
        assert!(adx.is_some());
        let value = adx.unwrap();
        assert!(value > 25.0, "expected ADX > 25 for strong trend, got {value}");
    }

    #[test]
    fn adx_flat_market() {
        let bars = vec![bar(100.0, 101.0, 99.0, 100.0); 60];
        let adx = calculate_adx(&bars, 14);
        assert!(adx.is_some());
        let value = adx.unwrap();
        assert!(value < 1.0, "expected ADX near 0 for flat market, got {value}");
    }

    #[test]
    fn adx_result_range() {
        let bars: Vec<Bar> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                bar(base - 0.5, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        if let Some(value) = calculate_adx(&bars, 14) {
            assert!((0.0..=100.0).contains(&value), "ADX {value} out of [0,100] range");
        }
    }

    #[test]
    fn adx_minimum_candles_exact() {
        let period = 5;
        let min = 2 * period + 1;
        let bars: Vec<Bar> = (0..min)
            .map(|i| {
                let base = 100.0 + i as f64;
                bar(base, base + 1.0, base - 0.5, base + 0.5)
            })
            .collect();
        assert!(calculate_adx(&bars, period).is_some());
        assert!(calculate_adx(&bars[..min - 1], period).is_none());
    }

    #[test]
    fn adxr_requires_extra_history() {
        let period = 14;
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64;
                bar(base, base + 1.0, base - 0.5, base + 0.5)
            })
            .collect();
        // 40 bars gives an ADX series but not necessarily enough for ADXR.
        let adxr = calculate_adxr(&bars, period);
        if let Some(v) = adxr {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn adxr_matches_average_of_current_and_lagged_adx() {
        let period = 5;
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                bar(base, base + 1.0, base - 0.5, base + 0.5)
            })
            .collect();
        let series = adx_series(&bars, period).unwrap();
        let adxr = calculate_adxr(&bars, period).unwrap();
        let expected = (series.last().unwrap() + series[series.len() - 1 - period]) / 2.0;
        assert!((adxr - expected).abs() < 1e-9);
    }
}
