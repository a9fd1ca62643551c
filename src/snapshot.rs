// =============================================================================
// Indicator Snapshot (§3.3) — flat, timeframe-prefixed indicator map
// =============================================================================
//
// Keyed by `"{timeframe}_{indicator_name}"` (e.g. `"1h_EMA_21"`,
// `"5m_RSI_14"`). Each entry is a short recent-history series (oldest
// first); scalar consumers take the last element, list-window operators
// (`all_above`, `oscillates_around`, ...) take a trailing slice. Built
// fresh per evaluation by the analysis service from the most recent N
// bars per timeframe; never persisted.
// =============================================================================

use std::collections::BTreeMap;

use crate::indicators::{adx, atr, bollinger, candle, ema, fibonacci, macd, rsi, sma, stochastic, volume, williams_r};
use crate::types::{Bar, Timeframe};

pub type IndicatorSnapshot = BTreeMap<String, Vec<f64>>;

/// Lookback depth the analysis service reads per timeframe (§4.6, "N >=
/// 250 bars" — sized for daily EMA_200's 200-bar seed requirement plus
/// headroom for window operators).
pub const MIN_LOOKBACK_BARS: usize = 250;

/// Build the flat indicator snapshot for one timeframe's bar history and
/// merge it into `snapshot` under the `"{timeframe}_*"` prefix.
///
/// `bars` must be oldest-first. Indicators that can't be computed (too
/// little history, non-finite input) are simply absent from the
/// snapshot — the condition evaluator treats a missing key as a 0.0
/// score rather than an error (§4.2, §7 BadInput).
pub fn populate_timeframe(snapshot: &mut IndicatorSnapshot, timeframe: Timeframe, bars: &[Bar]) {
    let prefix = timeframe.as_str();
    let mut put = |name: &str, series: Vec<f64>| {
        if !series.is_empty() {
            snapshot.insert(format!("{prefix}_{name}"), series);
        }
    };

    let closes: Vec<f64> = bars
        .iter()
        .filter_map(|b| rust_decimal::prelude::ToPrimitive::to_f64(&b.close))
        .collect();

    put("close", closes.clone());

    // --- Moving averages -----------------------------------------------
    put("EMA_21", ema::calculate_ema(&closes, 21));
    put("EMA_55", ema::calculate_ema(&closes, 55));
    put("EMA_200", ema::calculate_ema(&closes, 200));
    put("SMA_20", sma::calculate_sma(&closes, 20));
    put("SMA_50", sma::calculate_sma(&closes, 50));
    put("SMA_200", sma::calculate_sma(&closes, 200));

    // --- Trend -----------------------------------------------------------
    if let Some(m) = macd::calculate(&closes) {
        put("MACD", vec![m.macd]);
        put("MACD_Signal", vec![m.signal]);
        put("MACD_Histogram", vec![m.histogram]);
    }
    if let Some(adx_value) = adx::calculate_adx(bars, 14) {
        put("ADX", vec![adx_value]);
        let trend = if adx_value > 25.0 {
            let ema_fast = ema::calculate_ema(&closes, 21);
            let ema_slow = ema::calculate_ema(&closes, 55);
            match (ema_fast.last(), ema_slow.last()) {
                (Some(fast), Some(slow)) if fast > slow => 1.0,  // BULLISH
                (Some(fast), Some(slow)) if fast < slow => -1.0, // BEARISH
                _ => 0.0,                                        // SIDEWAYS
            }
        } else {
            0.0
        };
        put("Trend_Direction", vec![trend]);
    }
    if let Some(adxr) = adx::calculate_adxr(bars, 14) {
        put("ADXR", vec![adxr]);
    }

    // --- Momentum ---------------------------------------------------------
    put("RSI_7", rsi::calculate_rsi(&closes, 7));
    put("RSI_14", rsi::calculate_rsi(&closes, 14));
    put("RSI_21", rsi::calculate_rsi(&closes, 21));
    if let Some(stoch) = stochastic::calculate(bars) {
        put("Stochastic_K", vec![stoch.k]);
        put("Stochastic_D", vec![stoch.d]);
    }
    if let Some(wr) = williams_r::calculate(bars) {
        put("Williams_R", vec![wr]);
        let momentum_state = if wr >= -20.0 {
            1.0 // OVERBOUGHT
        } else if wr <= -80.0 {
            -1.0 // OVERSOLD
        } else {
            0.0 // NEUTRAL
        };
        put("Momentum_State", vec![momentum_state]);
    }

    // --- Volatility ---------------------------------------------------------
    put("ATR_14", atr::calculate_atr(bars, 14).into_iter().collect());
    put("ATR_21", atr::calculate_atr(bars, 21).into_iter().collect());
    if let Some(bb) = bollinger::calculate_bollinger(&closes, 20, 2.0) {
        put("BB_Upper", vec![bb.upper]);
        put("BB_Middle", vec![bb.middle]);
        put("BB_Lower", vec![bb.lower]);
        put("bollinger_width", vec![bb.width]);
        if let Some(&close) = closes.last() {
            let range = bb.upper - bb.lower;
            let position = if range > 0.0 { (close - bb.lower) / range } else { 0.5 };
            put("BB_Position", vec![position]);
            let volatility_state = if bb.width > 0.04 {
                1.0 // HIGH
            } else if bb.width < 0.015 {
                -1.0 // LOW
            } else {
                0.0 // NORMAL
            };
            put("Volatility_State", vec![volatility_state]);
        }
    }

    // --- Volume ---------------------------------------------------------
    put("Volume_SMA_20", volume::calculate_volume_sma(bars, 20).into_iter().collect());
    put("Volume_SMA_50", volume::calculate_volume_sma(bars, 50).into_iter().collect());
    if let Some(ratio) = volume::calculate_volume_ratio(bars, 20) {
        put("Volume_Ratio", vec![ratio]);
        let volume_state = if ratio > 1.5 {
            1.0 // HIGH
        } else if ratio < 0.5 {
            -1.0 // LOW
        } else {
            0.0 // NORMAL
        };
        put("Volume_State", vec![volume_state]);
    }
    put("OBV", volume::calculate_obv(bars));

    // --- Fibonacci ---------------------------------------------------------
    let fib_periods = fibonacci::swing_periods_for_timeframe(timeframe);
    if let Some(fib) = fibonacci::calculate_fibonacci_tiered(bars, fib_periods) {
        for (ratio, level) in fibonacci::RETRACEMENT_RATIOS.iter().zip(fib.retracements.iter()) {
            put(&format!("Fib_{ratio}"), vec![*level]);
        }
        for (ratio, level) in fibonacci::EXTENSION_RATIOS.iter().zip(fib.extensions.iter()) {
            put(&format!("Fib_{ratio}"), vec![*level]);
        }
    }

    // --- Candle shape ---------------------------------------------------------
    let shapes = candle::calculate_candle_shape_series(bars);
    put("candle_body", shapes.iter().map(|s| s.body).collect());
    put("candle_upper_shadow", shapes.iter().map(|s| s.upper_shadow).collect());
    put("candle_lower_shadow", shapes.iter().map(|s| s.lower_shadow).collect());
    put("candle_bullish", shapes.iter().map(|s| if s.bullish { 1.0 } else { 0.0 }).collect());
    put("candle_bearish", shapes.iter().map(|s| if s.bearish { 1.0 } else { 0.0 }).collect());
    if shapes.len() >= 2 {
        let lagged = &shapes[..shapes.len() - 1];
        put("candle_body_prev", lagged.iter().map(|s| s.body).collect());
        put("candle_bullish_prev", lagged.iter().map(|s| if s.bullish { 1.0 } else { 0.0 }).collect());
        put("candle_bearish_prev", lagged.iter().map(|s| if s.bearish { 1.0 } else { 0.0 }).collect());
    }
}
