// =============================================================================
// Gate pattern catalog types (§4.1, §6.6)
// =============================================================================
//
// A catalog is a map `pattern_name -> Pattern`. Each `Pattern` either
// carries a `conditions` list directly, or one or more named variants as
// sibling YAML keys (`bullish_trend`, `bearish_trend`, ...), captured via
// `#[serde(flatten)]` into `variants` — this mirrors the YAML shape
// exactly rather than forcing an artificial `variants:` wrapper key.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed set of valid condition operators (§4.1). Includes
/// `was_consistently_above`/`was_consistently_below`, which a prior
/// Python implementation's validator omitted — this catalog's validator
/// accepts the full set.
pub const VALID_OPERATORS: [&str; 17] = [
    ">",
    "<",
    ">=",
    "<=",
    "==",
    "!=",
    "between",
    "not_between",
    "all_above",
    "all_below",
    "any_above",
    "any_below",
    "near",
    "engulfs",
    "breaks",
    "oscillates_around",
    "was_consistently_above",
    "was_consistently_below",
];

fn default_timeframe() -> String {
    "1d".to_string()
}

fn default_weight() -> f64 {
    1.0
}

/// One scoring condition (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub indicator: String,
    pub operator: String,

    /// Another indicator name to resolve via the same lookup policy, OR
    /// (for `between`/`not_between`) a literal 2-element list.
    #[serde(default)]
    pub reference: Option<Value>,

    /// A literal value, used when `reference` is absent.
    #[serde(default)]
    pub value: Option<Value>,

    #[serde(default = "default_timeframe")]
    pub timeframe: String,

    #[serde(default)]
    pub multiplier: Option<f64>,

    #[serde(default)]
    pub tolerance: Option<f64>,

    /// Window size for `all_above`/`all_below`/`any_above`/`any_below`.
    #[serde(default)]
    pub periods: Option<usize>,

    /// Window size for `oscillates_around`.
    #[serde(default)]
    pub lookback_periods: Option<usize>,

    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// A single evaluable variant: a conditions list plus the pattern-variant
/// level metadata (§4.3.1).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternVariant {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub required_conditions: Vec<String>,

    /// Explicit `buy | sell` direction override (Open Question #2
    /// resolution); when absent, falls back to the substring heuristic.
    #[serde(default)]
    pub direction: Option<String>,
}

/// One named pattern within a gate catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub description: String,

    /// Case (a): conditions live directly on the pattern.
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,

    #[serde(default)]
    pub required_conditions: Vec<String>,

    #[serde(default)]
    pub direction: Option<String>,

    /// Gate 3 only: patterns with a non-empty list are skipped unless
    /// the propagated Gate 1 environment is a member.
    #[serde(default)]
    pub allowed_environments: Vec<String>,

    /// Gate 2 scenario only: selects a variant by (fuzzy-matched) Gate 1
    /// environment name.
    #[serde(default)]
    pub environment_conditions: Option<HashMap<String, PatternVariant>>,

    /// Case (b): named variants as sibling YAML keys
    /// (`bullish_trend`, `bearish_trend`, `uptrend_reversal`,
    /// `downtrend_reversal`, or any other scenario-specific name).
    #[serde(flatten)]
    pub variants: HashMap<String, PatternVariant>,
}

impl Pattern {
    /// `true` if this pattern carries conditions directly rather than
    /// through named variants or `environment_conditions`.
    pub fn has_direct_conditions(&self) -> bool {
        self.conditions.is_some()
    }

    /// View this pattern's direct conditions as a `PatternVariant`, for
    /// callers that want to evaluate it uniformly alongside named
    /// variants.
    pub fn as_direct_variant(&self) -> Option<PatternVariant> {
        self.conditions.as_ref().map(|conditions| PatternVariant {
            conditions: conditions.clone(),
            required_conditions: self.required_conditions.clone(),
            direction: self.direction.clone(),
        })
    }
}

fn default_min_confidence() -> f64 {
    0.6
}

/// Per-catalog override of the pattern-validity confidence threshold
/// (§4.3.1). Absent unless the YAML carries a `confidence_calculation`
/// block; callers fall back to the engine's own default otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceCalculation {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

/// A full gate catalog as loaded from one `gate{1,2,3}_patterns.yaml`
/// file (§6.6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternCatalog {
    pub patterns: HashMap<String, Pattern>,

    /// Gate 2 only. Keyed by normalized Gate 1 environment name
    /// (`trending_market`, `trend_reversal`, `ranging_market`), giving an
    /// ordered list of scenario names to try.
    #[serde(default)]
    pub environment_mapping: Option<EnvironmentMapping>,

    /// Optional per-catalog override of `min_confidence` (§4.3.1).
    #[serde(default)]
    pub confidence_calculation: Option<ConfidenceCalculation>,
}

impl PatternCatalog {
    /// The confidence threshold a pattern must meet to be valid: the
    /// catalog's own override if present, else `fallback` (the engine's
    /// configured default).
    pub fn min_confidence(&self, fallback: f64) -> f64 {
        self.confidence_calculation
            .as_ref()
            .map(|c| c.min_confidence)
            .unwrap_or(fallback)
    }
}

pub type EnvironmentMapping = HashMap<String, Vec<String>>;

/// Fixed priority order Gate 1 checks named variants in: first valid one
/// wins (§4.3.2).
pub const GATE1_VARIANT_ORDER: [&str; 4] = [
    "bullish_trend",
    "bearish_trend",
    "uptrend_reversal",
    "downtrend_reversal",
];

/// Gate 2's hard-coded default scenario list per normalized environment,
/// used only when the catalog has no `environment_mapping` section at
/// all (§4.3.3).
pub fn default_environment_mapping(environment: &str) -> &'static [&'static str] {
    match environment {
        "trending_market" => &["pullback_setup", "breakout_setup"],
        "trend_reversal" => &["first_pullback"],
        "ranging_market" => &["range_boundary"],
        _ => &[],
    }
}

/// Substring-containment keys Gate 2 uses to match an
/// `environment_conditions` entry against the propagated Gate 1 pattern
/// name (§4.3.3).
pub const ENVIRONMENT_CONDITION_KEYS: [(&str, &str); 4] = [
    ("trending_bull", "trending_market_bullish"),
    ("trending_bear", "trending_market_bearish"),
    ("trend_reversal", "trend_reversal"),
    ("ranging_market", "ranging_market"),
];
