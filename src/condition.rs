// =============================================================================
// Condition Evaluator
// =============================================================================
//
// Scores one pattern condition against an indicator snapshot, returning a
// value in [0, 1] (currently always exactly 0.0 or 1.0; intermediate
// values are reserved per §4.2). Never panics — any arithmetic exception
// or missing data yields 0.0, mirroring §7's BadInput/DataQuality
// handling.
// =============================================================================

use serde_json::Value;

use crate::patterns::Condition;
use crate::snapshot::IndicatorSnapshot;
use crate::types::Timeframe;

const EQUALITY_TOLERANCE: f64 = 1e-3;

/// Per-condition diagnostic, carried in `GateResult.additional_data` for
/// human inspection (§3.4).
#[derive(Debug, Clone)]
pub struct ConditionOutcome {
    pub name: String,
    pub score: f64,
    pub passed: bool,
    pub detail: String,
}

/// Evaluate one condition against `snapshot`. Never panics.
pub fn evaluate_condition(snapshot: &IndicatorSnapshot, condition: &Condition) -> ConditionOutcome {
    let score = evaluate_score(snapshot, condition);
    let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
    ConditionOutcome {
        name: condition.name.clone(),
        score,
        passed: score >= 0.5,
        detail: format!("{}:{} -> {:.2}", condition.indicator, condition.operator, score),
    }
}

fn evaluate_score(snapshot: &IndicatorSnapshot, condition: &Condition) -> f64 {
    let Some(series) = lookup_series(snapshot, &condition.timeframe, &condition.indicator) else {
        return 0.0;
    };
    if series.is_empty() {
        return 0.0;
    }

    match condition.operator.as_str() {
        "between" | "not_between" => evaluate_range(series, condition),
        "all_above" | "all_below" | "any_above" | "any_below" => {
            evaluate_logical(series, condition)
        }
        "oscillates_around" => evaluate_oscillates(series, condition),
        _ => evaluate_comparison(series, condition, snapshot),
    }
}

// =============================================================================
// Indicator / reference lookup (§4.2, the "critical, must be preserved
// exactly" four-tier policy)
// =============================================================================

fn lookup_series<'a>(
    snapshot: &'a IndicatorSnapshot,
    timeframe: &str,
    indicator: &str,
) -> Option<&'a Vec<f64>> {
    if let Some(series) = snapshot.get(&format!("{timeframe}_{indicator}")) {
        return Some(series);
    }
    if let Some(series) = snapshot.get(indicator) {
        return Some(series);
    }
    for tf in Timeframe::FALLBACK_ORDER {
        if let Some(series) = snapshot.get(&format!("{}_{}", tf.as_str(), indicator)) {
            return Some(series);
        }
    }
    None
}

fn resolve_literal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Resolve `condition.reference` (falling back to `condition.value`) to a
/// single scalar, applying `multiplier` if present. Returns `None` when
/// both are missing or the reference can't be resolved to a number.
fn resolve_reference_scalar(snapshot: &IndicatorSnapshot, condition: &Condition) -> Option<f64> {
    let raw = match &condition.reference {
        Some(Value::String(name)) => {
            lookup_series(snapshot, &condition.timeframe, name).and_then(|s| s.last().copied())
        }
        Some(other) => resolve_literal(other),
        None => condition.value.as_ref().and_then(resolve_literal),
    }?;

    match condition.multiplier {
        Some(m) if raw.is_finite() => Some(raw * m),
        _ => Some(raw),
    }
}

/// Resolve a 2-element `[min, max]` reference for `between`/`not_between`.
fn resolve_reference_range(condition: &Condition) -> Option<(f64, f64)> {
    let arr = condition.reference.as_ref()?.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    let min = resolve_literal(&arr[0])?;
    let max = resolve_literal(&arr[1])?;
    Some((min.min(max), min.max(max)))
}

// =============================================================================
// Operator families
// =============================================================================

fn evaluate_comparison(series: &[f64], condition: &Condition, snapshot: &IndicatorSnapshot) -> f64 {
    let Some(&value) = series.last() else { return 0.0 };
    if !value.is_finite() {
        return 0.0;
    }
    let Some(reference) = resolve_reference_scalar(snapshot, condition) else {
        return 0.0;
    };
    if !reference.is_finite() {
        return 0.0;
    }

    let satisfied = match condition.operator.as_str() {
        ">" | "was_consistently_above" => value > reference,
        "<" | "was_consistently_below" => value < reference,
        ">=" => value >= reference,
        "<=" => value <= reference,
        "==" => (value - reference).abs() <= EQUALITY_TOLERANCE,
        "!=" => (value - reference).abs() > EQUALITY_TOLERANCE,
        "near" => {
            let tolerance = condition.tolerance.unwrap_or(0.01);
            (value - reference).abs() <= tolerance * reference.abs()
        }
        "engulfs" => value.abs() > reference.abs() * 1.1,
        "breaks" => value > reference,
        _ => false,
    };

    if satisfied { 1.0 } else { 0.0 }
}

fn evaluate_range(series: &[f64], condition: &Condition) -> f64 {
    let Some(&value) = series.last() else { return 0.0 };
    if !value.is_finite() {
        return 0.0;
    }
    let Some((min, max)) = resolve_reference_range(condition) else {
        return 0.0;
    };

    let within = value >= min && value <= max;
    let satisfied = match condition.operator.as_str() {
        "between" => within,
        "not_between" => !within,
        _ => false,
    };

    if satisfied { 1.0 } else { 0.0 }
}

fn evaluate_logical(series: &[f64], condition: &Condition) -> f64 {
    let periods = condition.periods.unwrap_or(1).max(1);
    let window_start = series.len().saturating_sub(periods);
    let window = &series[window_start..];
    if window.is_empty() || window.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }

    // The reference itself must be resolvable; window operators only
    // ever compare against a literal/scalar reference (never another
    // snapshot series), matching the original's single-reference design.
    let Some(reference) = condition
        .reference
        .as_ref()
        .and_then(resolve_literal)
        .or_else(|| condition.value.as_ref().and_then(resolve_literal))
    else {
        return 0.0;
    };
    if !reference.is_finite() {
        return 0.0;
    }
    let reference = match condition.multiplier {
        Some(m) => reference * m,
        None => reference,
    };

    let satisfied = match condition.operator.as_str() {
        "all_above" => window.iter().all(|&v| v > reference),
        "all_below" => window.iter().all(|&v| v < reference),
        "any_above" => window.iter().any(|&v| v > reference),
        "any_below" => window.iter().any(|&v| v < reference),
        _ => false,
    };

    if satisfied { 1.0 } else { 0.0 }
}

fn evaluate_oscillates(series: &[f64], condition: &Condition) -> f64 {
    let periods = condition.lookback_periods.unwrap_or(5).max(1);
    let window_start = series.len().saturating_sub(periods);
    let window = &series[window_start..];
    if window.is_empty() || window.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }

    let Some(reference) = condition
        .reference
        .as_ref()
        .and_then(resolve_literal)
        .or_else(|| condition.value.as_ref().and_then(resolve_literal))
    else {
        return 0.0;
    };
    if !reference.is_finite() {
        return 0.0;
    }

    let above = window.iter().any(|&v| v > reference);
    let below = window.iter().any(|&v| v < reference);

    if above && below { 1.0 } else { 0.0 }
}
