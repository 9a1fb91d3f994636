//! Grader configuration
//!
//! Defaults are embedded from `files/grader.toml`; `GRADER_CONFIG` names a
//! replacement file and single fields can be overridden from the environment.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::EvalOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Nested calls allowed before a `RangeError` (default: 2000)
    pub max_call_depth: usize,
    /// Nesting depth at which structural comparison reports "not equal" (default: 512)
    pub max_equality_depth: usize,
    /// Evaluation thread stack in MB (default: 256)
    pub stack_size_mb: usize,
    /// Guarded runner wall-clock limit in ms, 0 disables (default: 5000)
    pub time_limit_ms: u64,
    pub catalog_path: String,
    /// File name used in stack traces (default: solution.js)
    pub source_name: String,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 2000,
            max_equality_depth: 512,
            stack_size_mb: 256,
            time_limit_ms: 5000,
            catalog_path: "files/problems.json".to_string(),
            source_name: "solution.js".to_string(),
        }
    }
}

impl GraderConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid grader configuration")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read grader configuration: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Apply `GRADER_TIME_LIMIT_MS` / `GRADER_MAX_CALL_DEPTH` style overrides.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(raw) = lookup("GRADER_TIME_LIMIT_MS") {
            self.time_limit_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid GRADER_TIME_LIMIT_MS: {}", raw))?;
        }
        if let Some(raw) = lookup("GRADER_MAX_CALL_DEPTH") {
            self.max_call_depth = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid GRADER_MAX_CALL_DEPTH: {}", raw))?;
        }
        Ok(())
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            max_call_depth: self.max_call_depth,
            source_name: self.source_name.clone(),
            interrupt: None,
        }
    }
}

/// Global grader configuration
static GRADER_CONFIG: OnceLock<GraderConfig> = OnceLock::new();

/// Load the configuration (embedded defaults, `GRADER_CONFIG`, env overrides).
pub fn load_config() -> anyhow::Result<GraderConfig> {
    let mut config = match std::env::var("GRADER_CONFIG") {
        Ok(path) => GraderConfig::from_file(Path::new(&path))?,
        Err(_) => GraderConfig::from_toml_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/files/grader.toml"
        )))?,
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Initialize the global configuration once
pub fn init_config() -> anyhow::Result<&'static GraderConfig> {
    let config = load_config()?;
    GRADER_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Grader configuration already initialized"))?;
    Ok(get_config())
}

/// Get grader configuration
pub fn get_config() -> &'static GraderConfig {
    GRADER_CONFIG.get().unwrap_or_else(|| {
        static DEFAULT: OnceLock<GraderConfig> = OnceLock::new();

        warn!("Grader configuration not initialized, using default");
        DEFAULT.get_or_init(GraderConfig::default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let embedded = GraderConfig::from_toml_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/files/grader.toml"
        )))
        .unwrap();
        assert_eq!(embedded, GraderConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time_limit_ms = 250\nsource_name = \"main.js\"").unwrap();

        let config = GraderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.time_limit_ms, 250);
        assert_eq!(config.source_name, "main.js");
        assert_eq!(config.max_call_depth, 2000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GraderConfig::default();
        config
            .apply_overrides(|key| match key {
                "GRADER_TIME_LIMIT_MS" => Some("0".to_string()),
                "GRADER_MAX_CALL_DEPTH" => Some(" 300 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.time_limit_ms, 0);
        assert_eq!(config.max_call_depth, 300);

        let err = config
            .apply_overrides(|key| (key == "GRADER_TIME_LIMIT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GRADER_TIME_LIMIT_MS"));
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(GraderConfig::from_toml_str("max_call_depth = \"deep\"").is_err());
    }
}
