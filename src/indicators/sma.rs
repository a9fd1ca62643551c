// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted rolling mean of closing prices. Used both as a standalone
// indicator (SMA_20/50/200) and as the seed value for EMA (see `ema.rs`).
// =============================================================================

/// Compute the SMA series over `closes` for the given `period`.
///
/// Returns one value per index once `period` closes are available; the
/// leading `period - 1` entries have no SMA and are omitted (unlike `ema`,
/// which seeds the series at index `period - 1`). Returns an empty vector
/// if `period` is zero or exceeds `closes.len()`.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(closes.len() - period + 1);
    let mut window_sum: f64 = closes[..period].iter().sum();
    out.push(window_sum / period as f64);

    for i in period..closes.len() {
        window_sum += closes[i] - closes[i - period];
        out.push(window_sum / period as f64);
    }

    out
}

/// Most recent SMA value, or `None` on insufficient data.
pub fn current_sma(closes: &[f64], period: usize) -> Option<f64> {
    calculate_sma(closes, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_period_zero() {
        assert!(calculate_sma(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn sma_exact_period() {
        let closes = vec![1.0, 2.0, 3.0];
        let sma = calculate_sma(&closes, 3);
        assert_eq!(sma, vec![2.0]);
    }

    #[test]
    fn sma_rolling_window() {
        let closes = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 2);
        assert_eq!(sma, vec![1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn current_sma_matches_last_value() {
        let closes = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(current_sma(&closes, 2), Some(35.0));
    }
}
