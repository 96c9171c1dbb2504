//! Loader configuration (`weft.toml`).
//!
//! ```toml
//! max_include_depth = 8
//! slow_fetch_threshold_ms = 250
//! log_identity_conflicts = true
//!
//! [environments.test]
//! slow_fetch_threshold_ms = 5000
//! ```
//!
//! Values can be overridden from the environment with `WEFT_MAX_INCLUDE_DEPTH`,
//! `WEFT_SLOW_FETCH_MS` and `WEFT_LOG_IDENTITY_CONFLICTS`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::relations::DEFAULT_MAX_INCLUDE_DEPTH;

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Longest include path accepted by the builder.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Fetches slower than this are logged at `warn`.
    #[serde(default = "default_slow_fetch_threshold_ms")]
    pub slow_fetch_threshold_ms: u64,

    /// Log identity conflicts at `warn`.
    #[serde(default = "default_true")]
    pub log_identity_conflicts: bool,

    /// Per-environment overrides.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environments: HashMap<String, LoaderOverride>,
}

/// Overrides applied by [`LoaderConfig::with_environment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderOverride {
    /// Override for `max_include_depth`.
    pub max_include_depth: Option<usize>,
    /// Override for `slow_fetch_threshold_ms`.
    pub slow_fetch_threshold_ms: Option<u64>,
    /// Override for `log_identity_conflicts`.
    pub log_identity_conflicts: Option<bool>,
}

fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

fn default_slow_fetch_threshold_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_include_depth: default_max_include_depth(),
            slow_fetch_threshold_ms: default_slow_fetch_threshold_ms(),
            log_identity_conflicts: true,
            environments: HashMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoadError::config_parse(format!("cannot read {}", path.display())).with_source(e)
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> LoadResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LoadError::config_parse(e.message().to_string()).with_source(e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the overrides of a named environment, if present.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            debug!(environment = env, "applying loader config overrides");
            self.apply(overrides);
        }
        self
    }

    /// Apply `WEFT_*` environment variable overrides.
    ///
    /// Unparseable values are rejected rather than ignored.
    pub fn with_env_overrides(self) -> LoadResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> LoadResult<Self> {
        fn parse<T: std::str::FromStr>(name: &str, raw: Option<String>) -> LoadResult<Option<T>> {
            raw.map(|v| {
                v.trim().parse::<T>().map_err(|_| {
                    LoadError::invalid_configuration(format!("{name} has an invalid value: {v:?}"))
                })
            })
            .transpose()
        }

        let overrides = LoaderOverride {
            max_include_depth: parse("WEFT_MAX_INCLUDE_DEPTH", lookup("WEFT_MAX_INCLUDE_DEPTH"))?,
            slow_fetch_threshold_ms: parse("WEFT_SLOW_FETCH_MS", lookup("WEFT_SLOW_FETCH_MS"))?,
            log_identity_conflicts: parse(
                "WEFT_LOG_IDENTITY_CONFLICTS",
                lookup("WEFT_LOG_IDENTITY_CONFLICTS"),
            )?,
        };
        self.apply(overrides);
        self.validate()?;
        Ok(self)
    }

    fn apply(&mut self, overrides: LoaderOverride) {
        if let Some(depth) = overrides.max_include_depth {
            self.max_include_depth = depth;
        }
        if let Some(ms) = overrides.slow_fetch_threshold_ms {
            self.slow_fetch_threshold_ms = ms;
        }
        if let Some(log) = overrides.log_identity_conflicts {
            self.log_identity_conflicts = log;
        }
    }

    /// Check the configuration for unusable values.
    pub fn validate(&self) -> LoadResult<()> {
        if self.max_include_depth == 0 {
            return Err(LoadError::invalid_configuration("max_include_depth must be at least 1")
                .with_help("Set max_include_depth to a positive value in weft.toml"));
        }
        for (name, overrides) in &self.environments {
            if overrides.max_include_depth == Some(0) {
                return Err(LoadError::invalid_configuration(format!(
                    "environments.{name}.max_include_depth must be at least 1"
                ))
                .with_help("Set max_include_depth to a positive value in weft.toml"));
            }
        }
        Ok(())
    }

    /// Set the longest accepted include path.
    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Set the slow fetch threshold.
    pub fn slow_fetch_threshold_ms(mut self, ms: u64) -> Self {
        self.slow_fetch_threshold_ms = ms;
        self
    }

    /// Enable or disable identity conflict logging.
    pub fn log_identity_conflicts(mut self, enabled: bool) -> Self {
        self.log_identity_conflicts = enabled;
        self
    }

    /// The slow fetch threshold as a duration.
    pub fn slow_fetch_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_fetch_threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::from_str("").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
        assert_eq!(config.slow_fetch_threshold(), Duration::from_secs(1));
        assert!(config.log_identity_conflicts);
    }

    #[test]
    fn test_parse_and_environment() {
        let config = LoaderConfig::from_str(
            r#"
            max_include_depth = 4
            log_identity_conflicts = false

            [environments.ci]
            slow_fetch_threshold_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.max_include_depth, 4);
        assert!(!config.log_identity_conflicts);

        let ci = config.clone().with_environment("ci");
        assert_eq!(ci.slow_fetch_threshold_ms, 5000);
        assert!(ci.environments.is_empty());

        let other = config.with_environment("prod");
        assert_eq!(other.slow_fetch_threshold_ms, 1000);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = LoaderConfig::from_str("max_depth = 3").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = LoaderConfig::from_str("max_include_depth = 0").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_rejects_zero_depth_in_environment() {
        let err = LoaderConfig::from_str("[environments.ci]\nmax_include_depth = 0").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.message.contains("environments.ci"));

        let mut config = LoaderConfig::default();
        config.environments.insert(
            "ci".to_string(),
            LoaderOverride {
                max_include_depth: Some(0),
                ..Default::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env = |name: &str| match name {
            "WEFT_MAX_INCLUDE_DEPTH" => Some("3".to_string()),
            "WEFT_LOG_IDENTITY_CONFLICTS" => Some("false".to_string()),
            _ => None,
        };
        let config = LoaderConfig::default().with_overrides_from(env).unwrap();
        assert_eq!(config.max_include_depth, 3);
        assert!(!config.log_identity_conflicts);
        assert_eq!(config.slow_fetch_threshold_ms, 1000);

        let bad = |name: &str| (name == "WEFT_SLOW_FETCH_MS").then(|| "soon".to_string());
        let err = LoaderConfig::default().with_overrides_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weft.toml");
        std::fs::write(&path, "slow_fetch_threshold_ms = 20\n").unwrap();
        let config = LoaderConfig::from_file(&path).unwrap();
        assert_eq!(config.slow_fetch_threshold(), Duration::from_millis(20));

        let missing = LoaderConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(missing.code, ErrorCode::ConfigParse);
    }
}
