//! Configuration for settlement graph reduction

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Graph construction
    pub builder: BuilderConfig,

    /// Fixed-point reduction
    pub reduction: ReductionConfig,

    /// Result output
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-graph".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            builder: BuilderConfig::default(),
            reduction: ReductionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Graph construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Net opposite-direction expenses right after building
    pub resolve_crossed_pairs: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            resolve_crossed_pairs: true,
        }
    }
}

/// Reduction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Give up after this many productive passes (unbounded if unset)
    pub max_passes: Option<usize>,

    /// Audit graph invariants before and after reduction
    pub verify_invariants: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            max_passes: None,
            verify_invariants: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty print JSON
    pub pretty_print: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `SETTLEMENT_*` environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Some(resolve) = env_var("SETTLEMENT_RESOLVE_CROSSED_PAIRS")? {
            self.builder.resolve_crossed_pairs = resolve;
        }

        if let Some(max_passes) = env_var("SETTLEMENT_MAX_PASSES")? {
            self.reduction.max_passes = Some(max_passes);
        }

        if let Some(verify) = env_var("SETTLEMENT_VERIFY_INVARIANTS")? {
            self.reduction.verify_invariants = verify;
        }

        if let Some(pretty) = env_var("SETTLEMENT_PRETTY_PRINT")? {
            self.output.pretty_print = pretty;
        }

        Ok(())
    }
}

fn env_var<T>(name: &str) -> crate::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| crate::Error::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.builder.resolve_crossed_pairs);
        assert!(config.reduction.verify_invariants);
        assert_eq!(config.reduction.max_passes, None);
        assert!(config.output.pretty_print);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[reduction]\nmax_passes = 50\n\n[output]\npretty_print = false"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.reduction.max_passes, Some(50));
        assert!(config.reduction.verify_invariants);
        assert!(!config.output.pretty_print);
        assert_eq!(config.service_name, "settlement-graph");
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reduction]\nmax_passes = \"lots\"").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/settlement.toml");
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
