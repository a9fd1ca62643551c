// =============================================================================
// PatternLoader — mtime-cached YAML catalog loading
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::catalog::{Pattern, PatternCatalog, VALID_OPERATORS};

struct CachedCatalog {
    catalog: Arc<PatternCatalog>,
    mtime: SystemTime,
}

/// Loads and caches gate pattern catalogs by file modification time.
/// Holds one cache slot per gate number (1, 2, 3); re-parses a catalog
/// only when its file's mtime has advanced since the last successful
/// load. On a parse or validation failure the *previous* cached value is
/// left untouched, so callers that don't need the reload keep working.
pub struct PatternLoader {
    config_dir: PathBuf,
    cache: RwLock<HashMap<u8, CachedCatalog>>,
}

impl PatternLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn path_for_gate(&self, gate: u8) -> PathBuf {
        self.config_dir.join(format!("gate{gate}_patterns.yaml"))
    }

    /// Load the catalog for `gate` (1, 2, or 3), using the mtime cache.
    pub fn load_gate_patterns(&self, gate: u8) -> Result<Arc<PatternCatalog>> {
        let path = self.path_for_gate(gate);
        let mtime = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("failed to stat pattern file {}", path.display()))?;

        if let Some(cached) = self.cache.read().get(&gate) {
            if cached.mtime >= mtime {
                debug!(gate, path = %path.display(), "pattern catalog cache hit");
                return Ok(Arc::clone(&cached.catalog));
            }
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read pattern file {}", path.display()))?;

        let catalog: PatternCatalog = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse pattern file {}", path.display()))?;

        validate_catalog(&catalog)
            .with_context(|| format!("pattern file {} failed validation", path.display()))?;

        let catalog = Arc::new(catalog);
        self.cache.write().insert(
            gate,
            CachedCatalog {
                catalog: Arc::clone(&catalog),
                mtime,
            },
        );

        info!(gate, path = %path.display(), patterns = catalog.patterns.len(), "pattern catalog (re)loaded");
        Ok(catalog)
    }
}

/// Full structural validation: every pattern has `name`/`description`,
/// every condition has `name`/`indicator`/`operator`, and every operator
/// is one of the 17 valid operators (§4.1).
fn validate_catalog(catalog: &PatternCatalog) -> Result<()> {
    for (key, pattern) in &catalog.patterns {
        validate_pattern(key, pattern)?;
    }
    Ok(())
}

fn validate_pattern(key: &str, pattern: &Pattern) -> Result<()> {
    if pattern.name.trim().is_empty() {
        bail!("pattern '{key}' is missing a name");
    }
    if pattern.description.trim().is_empty() {
        bail!("pattern '{key}' is missing a description");
    }

    if let Some(conditions) = &pattern.conditions {
        for condition in conditions {
            validate_condition(key, condition)?;
        }
    }

    for (variant_name, variant) in &pattern.variants {
        for condition in &variant.conditions {
            validate_condition(&format!("{key}.{variant_name}"), condition)?;
        }
    }

    if let Some(environment_conditions) = &pattern.environment_conditions {
        for (env_key, variant) in environment_conditions {
            for condition in &variant.conditions {
                validate_condition(&format!("{key}.{env_key}"), condition)?;
            }
        }
    }

    Ok(())
}

fn validate_condition(context: &str, condition: &super::catalog::Condition) -> Result<()> {
    if condition.name.trim().is_empty() {
        bail!("condition in pattern '{context}' is missing a name");
    }
    if condition.indicator.trim().is_empty() {
        bail!("condition '{}' in pattern '{context}' is missing an indicator", condition.name);
    }
    if !VALID_OPERATORS.contains(&condition.operator.as_str()) {
        bail!(
            "condition '{}' in pattern '{context}' has invalid operator '{}'",
            condition.name,
            condition.operator
        );
    }
    Ok(())
}

/// Strip a gate suffix override from the default filename; exposed for
/// callers that want to know where a catalog would be read from without
/// triggering a load (e.g. startup diagnostics).
pub fn catalog_path(config_dir: &Path, gate: u8) -> PathBuf {
    config_dir.join(format!("gate{gate}_patterns.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_catalog(dir: &Path, gate: u8, content: &str) {
        let path = catalog_path(dir, gate);
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const VALID_YAML: &str = r#"
patterns:
  trend_environment:
    name: trend_environment
    description: simple trend pattern
    bullish_trend:
      conditions:
        - name: above_ema
          indicator: close
          operator: ">"
          reference: EMA_21
"#;

    #[test]
    fn loads_and_validates_a_fresh_catalog() {
        let dir = tempdir().unwrap();
        write_catalog(dir.path(), 1, VALID_YAML);
        let loader = PatternLoader::new(dir.path());
        let catalog = loader.load_gate_patterns(1).unwrap();
        assert!(catalog.patterns.contains_key("trend_environment"));
    }

    #[test]
    fn cache_hit_without_file_change() {
        let dir = tempdir().unwrap();
        write_catalog(dir.path(), 1, VALID_YAML);
        let loader = PatternLoader::new(dir.path());
        let first = loader.load_gate_patterns(1).unwrap();
        let second = loader.load_gate_patterns(1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let loader = PatternLoader::new(dir.path());
        assert!(loader.load_gate_patterns(1).is_err());
    }

    #[test]
    fn invalid_operator_fails_validation() {
        let dir = tempdir().unwrap();
        let bad_yaml = r#"
patterns:
  x:
    name: x
    description: d
    conditions:
      - name: c1
        indicator: close
        operator: "not_a_real_operator"
"#;
        write_catalog(dir.path(), 1, bad_yaml);
        let loader = PatternLoader::new(dir.path());
        assert!(loader.load_gate_patterns(1).is_err());
    }

    #[test]
    fn missing_pattern_description_fails_validation() {
        let dir = tempdir().unwrap();
        let bad_yaml = r#"
patterns:
  x:
    name: x
    description: ""
    conditions: []
"#;
        write_catalog(dir.path(), 1, bad_yaml);
        let loader = PatternLoader::new(dir.path());
        assert!(loader.load_gate_patterns(1).is_err());
    }

    #[test]
    fn reload_after_mtime_advances() {
        let dir = tempdir().unwrap();
        write_catalog(dir.path(), 1, VALID_YAML);
        let loader = PatternLoader::new(dir.path());
        let first = loader.load_gate_patterns(1).unwrap();

        // Ensure the filesystem mtime visibly advances on coarse-grained
        // filesystems before rewriting the file.
        std::thread::sleep(std::time::Duration::from_millis(10));

        let updated_yaml = VALID_YAML.replace("trend_environment", "trend_environment_v2");
        write_catalog(dir.path(), 1, &updated_yaml);

        let second = loader.load_gate_patterns(1).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.patterns.contains_key("trend_environment_v2"));
    }
}
