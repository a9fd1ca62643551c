// =============================================================================
// Pattern Loader
// =============================================================================
//
// Loads gate catalogs from YAML on demand, caches by file modification
// time, and validates structure before handing a catalog to the engine.

pub mod catalog;
pub mod loader;

pub use catalog::{
    default_environment_mapping, Condition, ConfidenceCalculation, EnvironmentMapping, Pattern,
    PatternCatalog, PatternVariant, ENVIRONMENT_CONDITION_KEYS, GATE1_VARIANT_ORDER,
    VALID_OPERATORS,
};
pub use loader::PatternLoader;
