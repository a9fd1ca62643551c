// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the technical indicators the
// condition evaluator can reference. Every public function returns
// `Option<T>` (or a `Vec` that is empty on insufficient data) so callers are
// forced to handle insufficient-data and numerical-edge-case scenarios.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod candle;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volume;
pub mod williams_r;
