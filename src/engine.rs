// =============================================================================
// Three-Gate Engine
// =============================================================================
//
// Runs Gate 1 (environment) -> Gate 2 (scenario) -> Gate 3 (trigger) in
// strict order, short-circuiting on the first failure, then assembles
// entry/stop-loss/take-profit levels and applies a per-symbol signal
// rate limiter. Statistics are in-memory only, reset at process start.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::condition::evaluate_condition;
use crate::patterns::{
    default_environment_mapping, PatternCatalog, PatternLoader, PatternVariant,
    ENVIRONMENT_CONDITION_KEYS, GATE1_VARIANT_ORDER,
};
use crate::snapshot::IndicatorSnapshot;
use crate::types::{GateResult, SignalType, ThreeGateResult};

/// Fixed risk-management constants (§4.3.6). Never user-configurable.
const MIN_RISK_PIPS: f64 = 3.0;
const ATR_MULTIPLIER_MIN: f64 = 0.8;
/// Carried over from the original risk constants; never referenced by
/// the entry/SL/TP formulas there either.
#[allow(dead_code)]
const ATR_MULTIPLIER_MAX: f64 = 2.0;
const BUFFER_PIPS: f64 = 2.0;
const TAKE_PROFIT_RATIOS: [f64; 3] = [2.0, 3.0, 4.0];
const PIP: f64 = 1e-4;
const DEFAULT_ATR: f64 = 0.01;

/// In-memory counters (§4.4), reset at process start.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub total_evaluations: u64,
    pub gate1_pass: u64,
    pub gate2_pass: u64,
    pub gate3_pass: u64,
    pub signals_emitted: u64,
    pub cumulative_eval_nanos: u128,
}

impl Stats {
    fn record_eval(&mut self, elapsed: Duration) {
        self.total_evaluations += 1;
        self.cumulative_eval_nanos += elapsed.as_nanos();
    }
}

struct EngineState {
    stats: Stats,
    last_signal_time: HashMap<String, Instant>,
}

/// Orchestrates Gate 1/2/3 evaluation for one symbol's indicator snapshot.
pub struct ThreeGateEngine {
    loader: PatternLoader,
    min_confidence: f64,
    min_signal_interval: Duration,
    disable_rate_limit: bool,
    state: Mutex<EngineState>,
}

impl ThreeGateEngine {
    pub fn new(
        config_dir: impl Into<std::path::PathBuf>,
        min_confidence: f64,
        min_signal_interval_minutes: i64,
        disable_rate_limit: bool,
    ) -> Self {
        Self {
            loader: PatternLoader::new(config_dir),
            min_confidence,
            min_signal_interval: Duration::from_secs((min_signal_interval_minutes.max(0) as u64) * 60),
            disable_rate_limit,
            state: Mutex::new(EngineState {
                stats: Stats::default(),
                last_signal_time: HashMap::new(),
            }),
        }
    }

    pub fn stats(&self) -> Stats {
        self.state.lock().stats
    }

    /// Evaluate `symbol` against `snapshot`. Returns `None` when any gate
    /// fails, the assembled signal is rate-limited, or the direction
    /// resolves to `NEUTRAL` (neutral results are never signals, §3.5).
    pub fn evaluate(&self, symbol: &str, snapshot: &IndicatorSnapshot) -> Option<ThreeGateResult> {
        let started = Instant::now();
        let result = self.evaluate_inner(symbol, snapshot);

        let mut state = self.state.lock();
        state.stats.record_eval(started.elapsed());
        if state.stats.total_evaluations % 100 == 0 {
            info!(
                total = state.stats.total_evaluations,
                gate1_pass = state.stats.gate1_pass,
                gate2_pass = state.stats.gate2_pass,
                gate3_pass = state.stats.gate3_pass,
                signals_emitted = state.stats.signals_emitted,
                "three-gate engine stats"
            );
        }
        result
    }

    fn evaluate_inner(&self, symbol: &str, snapshot: &IndicatorSnapshot) -> Option<ThreeGateResult> {
        let gate1_catalog = self.loader.load_gate_patterns(1).ok()?;
        let gate1 = self.evaluate_gate1(&gate1_catalog, snapshot);
        if !gate1.valid {
            debug!(symbol, "gate 1: no valid environment pattern");
            return None;
        }
        self.state.lock().stats.gate1_pass += 1;

        let gate2_catalog = self.loader.load_gate_patterns(2).ok()?;
        let gate2 = self.evaluate_gate2(&gate2_catalog, snapshot, &gate1);
        if !gate2.valid {
            debug!(symbol, pattern = %gate1.pattern, "gate 2: no valid scenario");
            return None;
        }
        self.state.lock().stats.gate2_pass += 1;

        let gate3_catalog = self.loader.load_gate_patterns(3).ok()?;
        let gate3 = self.evaluate_gate3(&gate3_catalog, snapshot, &gate1);
        if !gate3.valid {
            debug!(symbol, "gate 3: no valid trigger");
            return None;
        }
        self.state.lock().stats.gate3_pass += 1;

        let overall_confidence = (gate1.confidence + gate2.confidence + gate3.confidence) / 3.0;
        let signal_type = resolve_signal_type(&gate1, &gate3);
        if signal_type == SignalType::Neutral {
            debug!(symbol, "gates passed but signal direction resolved to neutral");
            return None;
        }

        if !self.rate_limit_ok(symbol) {
            debug!(symbol, "signal suppressed by rate limiter");
            return None;
        }

        let (entry_price, stop_loss, take_profit) = compute_risk_levels(snapshot, signal_type);

        let result = ThreeGateResult {
            symbol: symbol.to_string(),
            gate1,
            gate2,
            gate3,
            overall_confidence,
            signal_type,
            entry_price,
            stop_loss,
            take_profit,
            timestamp: chrono::Utc::now(),
        };

        self.record_signal(symbol);
        info!(
            symbol,
            signal_type = %signal_type,
            confidence = overall_confidence,
            entry = entry_price,
            "three-gate signal emitted"
        );
        Some(result)
    }

    fn rate_limit_ok(&self, symbol: &str) -> bool {
        if self.disable_rate_limit {
            return true;
        }
        let state = self.state.lock();
        match state.last_signal_time.get(symbol) {
            Some(last) => last.elapsed() >= self.min_signal_interval,
            None => true,
        }
    }

    fn record_signal(&self, symbol: &str) {
        let mut state = self.state.lock();
        state.stats.signals_emitted += 1;
        state.last_signal_time.insert(symbol.to_string(), Instant::now());
    }

    // ---------------------------------------------------------------------
    // Gate 1 — Environment recognition (§4.3.2)
    // ---------------------------------------------------------------------

    fn evaluate_gate1(&self, catalog: &PatternCatalog, snapshot: &IndicatorSnapshot) -> GateResult {
        for (pattern_name, pattern) in &catalog.patterns {
            if let Some(direct) = pattern.as_direct_variant() {
                if let Some(result) =
                    self.score_variant(catalog, pattern_name, &direct, snapshot, pattern_name)
                {
                    return result;
                }
            }
            for variant_name in GATE1_VARIANT_ORDER {
                if let Some(variant) = pattern.variants.get(variant_name) {
                    let label = format!("{pattern_name}_{variant_name}");
                    if let Some(result) =
                        self.score_variant(catalog, pattern_name, variant, snapshot, &label)
                    {
                        return result;
                    }
                }
            }
        }
        GateResult::invalid("no_valid_pattern")
    }

    // ---------------------------------------------------------------------
    // Gate 2 — Scenario selection (§4.3.3)
    // ---------------------------------------------------------------------

    fn evaluate_gate2(
        &self,
        catalog: &PatternCatalog,
        snapshot: &IndicatorSnapshot,
        gate1: &GateResult,
    ) -> GateResult {
        let normalized = normalize_environment(&gate1.pattern);

        let candidates: Vec<String> = match &catalog.environment_mapping {
            Some(mapping) => mapping.get(normalized.as_str()).cloned().unwrap_or_default(),
            None => default_environment_mapping(&normalized)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let mut evaluated = Vec::new();
        for scenario_name in &candidates {
            let Some(pattern) = catalog.patterns.get(scenario_name) else {
                continue;
            };
            evaluated.push(scenario_name.clone());

            if let Some(environment_conditions) = &pattern.environment_conditions {
                for (env_key, variant) in environment_conditions {
                    if matches_environment_key(env_key, &gate1.pattern) {
                        if let Some(mut result) =
                            self.score_variant(catalog, scenario_name, variant, snapshot, scenario_name)
                        {
                            result
                                .additional_data
                                .insert("gate1_environment".to_string(), gate1.pattern.clone().into());
                            return result;
                        }
                    }
                }
            } else if let Some(direct) = pattern.as_direct_variant() {
                if let Some(mut result) =
                    self.score_variant(catalog, scenario_name, &direct, snapshot, scenario_name)
                {
                    result
                        .additional_data
                        .insert("gate1_environment".to_string(), gate1.pattern.clone().into());
                    return result;
                }
            }
        }

        let mut result = GateResult::invalid("no_valid_scenario");
        result.additional_data.insert(
            "scenarios_evaluated".to_string(),
            serde_json::Value::from(evaluated),
        );
        result
    }

    // ---------------------------------------------------------------------
    // Gate 3 — Trigger (§4.3.4)
    // ---------------------------------------------------------------------

    fn evaluate_gate3(
        &self,
        catalog: &PatternCatalog,
        snapshot: &IndicatorSnapshot,
        gate1: &GateResult,
    ) -> GateResult {
        let environment = gate1.pattern.as_str();
        for (pattern_name, pattern) in &catalog.patterns {
            if !pattern.allowed_environments.is_empty()
                && !pattern
                    .allowed_environments
                    .iter()
                    .any(|e| environment.contains(e.as_str()))
            {
                continue;
            }

            if let Some(direct) = pattern.as_direct_variant() {
                if let Some(result) =
                    self.score_variant(catalog, pattern_name, &direct, snapshot, pattern_name)
                {
                    return result;
                }
            }
            for (variant_name, variant) in &pattern.variants {
                let label = format!("{pattern_name}_{variant_name}");
                if let Some(result) =
                    self.score_variant(catalog, pattern_name, variant, snapshot, &label)
                {
                    return result;
                }
            }
        }
        GateResult::invalid("no_valid_trigger")
    }

    // ---------------------------------------------------------------------
    // Shared pattern/variant scoring (§4.3.1)
    // ---------------------------------------------------------------------

    fn score_variant(
        &self,
        catalog: &PatternCatalog,
        _pattern_key: &str,
        variant: &PatternVariant,
        snapshot: &IndicatorSnapshot,
        label: &str,
    ) -> Option<GateResult> {
        if variant.conditions.is_empty() {
            return None;
        }

        let mut passed = Vec::new();
        let mut failed = Vec::new();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for condition in &variant.conditions {
            let outcome = evaluate_condition(snapshot, condition);
            let weight = condition.weight;
            weighted_sum += outcome.score * weight;
            weight_total += weight;
            if outcome.passed {
                passed.push(condition.name.clone());
            } else {
                failed.push(condition.name.clone());
            }
        }

        let confidence = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.0 };
        let required_met = variant
            .required_conditions
            .iter()
            .all(|name| passed.contains(name));

        let threshold = catalog.min_confidence(self.min_confidence);
        if confidence >= threshold && required_met {
            let mut additional_data = serde_json::Map::new();
            if let Some(direction) = &variant.direction {
                additional_data.insert("direction".to_string(), direction.clone().into());
            }
            Some(GateResult {
                valid: true,
                pattern: label.to_string(),
                confidence,
                passed_conditions: passed,
                failed_conditions: failed,
                additional_data,
                timestamp: chrono::Utc::now(),
            })
        } else {
            None
        }
    }
}

fn normalize_environment(gate1_pattern: &str) -> String {
    gate1_pattern
        .trim_end_matches("_bullish")
        .trim_end_matches("_bearish")
        .to_string()
}

fn matches_environment_key(env_key: &str, gate1_pattern: &str) -> bool {
    ENVIRONMENT_CONDITION_KEYS
        .iter()
        .any(|(key, target)| key == &env_key && gate1_pattern.contains(target))
}

fn resolve_signal_type(gate1: &GateResult, gate3: &GateResult) -> SignalType {
    // Gate 1's environment designation always wins: a bearish environment
    // never emits a buy signal, regardless of which trigger pattern Gate 3
    // matched against it.
    if gate1.pattern.contains("bullish") {
        return SignalType::Buy;
    }
    if gate1.pattern.contains("bearish") {
        return SignalType::Sell;
    }

    // Gate 1 is neutral/ranging — defer to Gate 3's trigger direction.
    if let Some(direction) = gate3.additional_data.get("direction").and_then(|v| v.as_str()) {
        return match direction {
            "buy" => SignalType::Buy,
            "sell" => SignalType::Sell,
            _ => SignalType::Neutral,
        };
    }

    let trigger = gate3.pattern.as_str();
    if trigger.contains("pinbar_down") || trigger.contains("bearish") || trigger.contains("momentum_down") {
        SignalType::Sell
    } else if trigger.contains("pinbar_up") || trigger.contains("bullish") || trigger.contains("momentum_up") {
        SignalType::Buy
    } else {
        SignalType::Neutral
    }
}

// =============================================================================
// Entry / Stop-loss / Take-profit (§4.3.6)
// =============================================================================

fn last_value(snapshot: &IndicatorSnapshot, key: &str) -> Option<f64> {
    snapshot.get(key).and_then(|s| s.last()).copied().filter(|v| v.is_finite())
}

fn current_price(snapshot: &IndicatorSnapshot) -> f64 {
    for key in ["5m_close", "1h_close", "4h_close", "1d_close"] {
        if let Some(v) = last_value(snapshot, key) {
            return v;
        }
    }
    0.0
}

fn current_atr(snapshot: &IndicatorSnapshot) -> f64 {
    for key in ["1h_ATR_14", "4h_ATR_14", "5m_ATR_14", "1d_ATR_14"] {
        if let Some(v) = last_value(snapshot, key) {
            if v > 0.0 {
                return v;
            }
        }
    }
    DEFAULT_ATR
}

const SR_TIMEFRAMES: [&str; 3] = ["1h", "4h", "1d"];
const SR_INDICATORS: [&str; 6] = ["BB_Upper", "BB_Middle", "BB_Lower", "EMA_21", "EMA_55", "EMA_200"];
const FIB_RETRACEMENT_KEYS: [&str; 5] = ["0.236", "0.382", "0.5", "0.618", "0.786"];
const FIB_EXTENSION_KEYS: [&str; 4] = ["1.272", "1.414", "1.618", "2"];

/// Collect every support/resistance candidate level present in the
/// snapshot (Bollinger bands, moving averages, Fibonacci retracements and
/// extensions, across `1h/4h/1d`).
fn sr_candidates(snapshot: &IndicatorSnapshot) -> Vec<f64> {
    let mut levels = Vec::new();
    for tf in SR_TIMEFRAMES {
        for indicator in SR_INDICATORS {
            if let Some(v) = last_value(snapshot, &format!("{tf}_{indicator}")) {
                levels.push(v);
            }
        }
        for ratio in FIB_RETRACEMENT_KEYS.iter().chain(FIB_EXTENSION_KEYS.iter()) {
            if let Some(v) = last_value(snapshot, &format!("{tf}_Fib_{ratio}")) {
                levels.push(v);
            }
        }
    }
    levels
}

fn compute_risk_levels(snapshot: &IndicatorSnapshot, signal_type: SignalType) -> (f64, f64, [f64; 3]) {
    let entry = current_price(snapshot);
    let atr = current_atr(snapshot);
    let candidates = sr_candidates(snapshot);
    let buy = signal_type == SignalType::Buy;

    let atr_floor = (atr * ATR_MULTIPLIER_MIN).max(MIN_RISK_PIPS * PIP);
    let buffer = BUFFER_PIPS * PIP;

    let stop_loss = if buy {
        let best_support = candidates
            .iter()
            .copied()
            .filter(|&level| entry - level >= buffer)
            .fold(f64::NEG_INFINITY, f64::max);
        if best_support.is_finite() {
            (best_support - buffer).max(entry - atr_floor)
        } else {
            entry - atr_floor
        }
    } else {
        let best_resistance = candidates
            .iter()
            .copied()
            .filter(|&level| level - entry >= buffer)
            .fold(f64::INFINITY, f64::min);
        if best_resistance.is_finite() {
            (best_resistance + buffer).min(entry + atr_floor)
        } else {
            entry + atr_floor
        }
    };

    let mut take_profits = [0.0f64; 3];
    let mut previous: Option<f64> = None;

    for (i, ratio) in TAKE_PROFIT_RATIOS.iter().enumerate() {
        let tp_atr = if buy { entry + ratio * atr } else { entry - ratio * atr };

        let nearest = if buy {
            candidates
                .iter()
                .copied()
                .filter(|&level| level > entry)
                .min_by(|a, b| (a - tp_atr).abs().total_cmp(&(b - tp_atr).abs()))
        } else {
            candidates
                .iter()
                .copied()
                .filter(|&level| level < entry)
                .min_by(|a, b| (a - tp_atr).abs().total_cmp(&(b - tp_atr).abs()))
        };

        let mut candidate_tp = match nearest {
            Some(level) if (level - tp_atr).abs() <= atr * 0.5 => {
                if buy {
                    level - buffer
                } else {
                    level + buffer
                }
            }
            _ => tp_atr,
        };

        // Monotonicity guard (explicit addition, see DESIGN.md): a snapped
        // level that regresses relative to the previous TP falls back to
        // the unsnapped ATR-ratio level for this slot.
        if let Some(prev) = previous {
            let monotonic = if buy { candidate_tp > prev } else { candidate_tp < prev };
            if !monotonic {
                candidate_tp = tp_atr;
            }
        }

        take_profits[i] = candidate_tp;
        previous = Some(candidate_tp);
    }

    (entry, stop_loss, take_profits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(dir: &std::path::Path, gate: u8, content: &str) {
        let path = dir.join(format!("gate{gate}_patterns.yaml"));
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn sample_snapshot() -> IndicatorSnapshot {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("1h_close".to_string(), vec![150.0, 151.0]);
        snapshot.insert("1h_ATR_14".to_string(), vec![0.5]);
        snapshot.insert("1h_EMA_21".to_string(), vec![149.0]);
        snapshot
    }

    const GATE1_YAML: &str = r#"
patterns:
  trending_market:
    name: trending_market
    description: trend environment
    bullish_trend:
      conditions:
        - name: above_ema
          indicator: close
          operator: ">"
          reference: EMA_21
          timeframe: "1h"
"#;

    const GATE2_YAML: &str = r#"
patterns:
  pullback_setup:
    name: pullback_setup
    description: pullback scenario
    conditions:
      - name: price_check
        indicator: close
        operator: ">"
        value: 100.0
        timeframe: "1h"
  breakout_setup:
    name: breakout_setup
    description: breakout scenario
    conditions:
      - name: price_check
        indicator: close
        operator: ">"
        value: 1000.0
        timeframe: "1h"
"#;

    const GATE3_YAML: &str = r#"
patterns:
  momentum_up_trigger:
    name: momentum_up_trigger
    description: momentum trigger
    conditions:
      - name: atr_present
        indicator: ATR_14
        operator: ">"
        value: 0.0
        timeframe: "1h"
"#;

    fn engine_with_catalogs(dir: &std::path::Path) -> ThreeGateEngine {
        write_yaml(dir, 1, GATE1_YAML);
        write_yaml(dir, 2, GATE2_YAML);
        write_yaml(dir, 3, GATE3_YAML);
        ThreeGateEngine::new(dir, 0.6, 15, true)
    }

    #[test]
    fn full_pipeline_emits_buy_signal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_catalogs(dir.path());
        let snapshot = sample_snapshot();
        let result = engine.evaluate("USDJPY", &snapshot).expect("expected a signal");
        assert_eq!(result.signal_type, SignalType::Buy);
        assert!(result.gate1.pattern.contains("bullish"));
        assert_eq!(result.gate2.pattern, "pullback_setup");
    }

    #[test]
    fn missing_catalog_file_yields_no_signal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ThreeGateEngine::new(dir.path(), 0.6, 15, true);
        let snapshot = sample_snapshot();
        assert!(engine.evaluate("USDJPY", &snapshot).is_none());
    }

    #[test]
    fn rate_limiter_blocks_second_signal_within_window() {
        let dir = tempfile::tempdir().unwrap();
        write_yaml(dir.path(), 1, GATE1_YAML);
        write_yaml(dir.path(), 2, GATE2_YAML);
        write_yaml(dir.path(), 3, GATE3_YAML);
        let engine = ThreeGateEngine::new(dir.path(), 0.6, 15, false);
        let snapshot = sample_snapshot();
        assert!(engine.evaluate("USDJPY", &snapshot).is_some());
        assert!(engine.evaluate("USDJPY", &snapshot).is_none());
    }

    #[test]
    fn stats_track_gate_pass_counts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_catalogs(dir.path());
        let snapshot = sample_snapshot();
        engine.evaluate("USDJPY", &snapshot);
        let stats = engine.stats();
        assert_eq!(stats.total_evaluations, 1);
        assert_eq!(stats.gate1_pass, 1);
        assert_eq!(stats.gate2_pass, 1);
        assert_eq!(stats.gate3_pass, 1);
        assert_eq!(stats.signals_emitted, 1);
    }

    #[test]
    fn compute_risk_levels_buy_orders_take_profits_ascending() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("1h_close".to_string(), vec![150.0]);
        snapshot.insert("1h_ATR_14".to_string(), vec![0.30]);
        let (entry, stop_loss, tp) = compute_risk_levels(&snapshot, SignalType::Buy);
        assert_eq!(entry, 150.0);
        assert!(stop_loss < entry);
        assert!(tp[0] < tp[1]);
        assert!(tp[1] < tp[2]);
    }

    #[test]
    fn compute_risk_levels_sell_orders_take_profits_descending() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("1h_close".to_string(), vec![150.0]);
        snapshot.insert("1h_ATR_14".to_string(), vec![0.30]);
        let (entry, stop_loss, tp) = compute_risk_levels(&snapshot, SignalType::Sell);
        assert_eq!(entry, 150.0);
        assert!(stop_loss > entry);
        assert!(tp[0] > tp[1]);
        assert!(tp[1] > tp[2]);
    }

    #[test]
    fn compute_risk_levels_defaults_atr_when_absent() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("1h_close".to_string(), vec![100.0]);
        let (entry, stop_loss, _tp) = compute_risk_levels(&snapshot, SignalType::Buy);
        assert_eq!(entry, 100.0);
        // default ATR = 0.01, atr_multiplier_min = 0.8 => atr_floor = 0.008,
        // but min_risk_pips*1e-4 = 0.0003 so atr_floor stays 0.008.
        assert!((entry - stop_loss - 0.008).abs() < 1e-9);
    }

    #[test]
    fn normalize_environment_strips_direction_suffix() {
        assert_eq!(normalize_environment("trending_market_bullish"), "trending_market");
        assert_eq!(normalize_environment("trending_market_bearish"), "trending_market");
        assert_eq!(normalize_environment("ranging_market"), "ranging_market");
    }

    #[test]
    fn matches_environment_key_checks_substring() {
        assert!(matches_environment_key("trending_bull", "trending_market_bullish"));
        assert!(!matches_environment_key("trending_bull", "trending_market_bearish"));
    }

    #[test]
    fn resolve_signal_type_never_overrides_bearish_gate1_with_gate3_direction() {
        let gate1 = GateResult {
            pattern: "trending_market_bearish".to_string(),
            ..GateResult::invalid("trending_market_bearish")
        };
        let mut gate3 = GateResult::invalid("uptrend_pinbar");
        gate3.pattern = "uptrend_pinbar".to_string();
        gate3
            .additional_data
            .insert("direction".to_string(), serde_json::Value::from("buy"));
        assert_eq!(resolve_signal_type(&gate1, &gate3), SignalType::Sell);
    }

    #[test]
    fn resolve_signal_type_uses_gate3_direction_when_gate1_is_neutral() {
        let gate1 = GateResult::invalid("ranging_market");
        let mut gate3 = GateResult::invalid("breakout_trigger");
        gate3
            .additional_data
            .insert("direction".to_string(), serde_json::Value::from("sell"));
        assert_eq!(resolve_signal_type(&gate1, &gate3), SignalType::Sell);
    }
}
