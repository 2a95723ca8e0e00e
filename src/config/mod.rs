//! Job configuration
//!
//! Settings are layered, each source overriding the previous one:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`)
//! 3. Environment variables with the `MAPMUL_` prefix
//! 4. Command-line flags
//!
//! ```toml
//! strategy = "shared-dimension"
//! combiner = true
//! skip_zeros = false
//! max_parallel = 8
//! reduce_partitions = 16
//! split_rows = 64
//! max_retries = 2
//! log_level = "debug"
//! ```

use crate::error::{ErrorCode, MapmulError, Result};
use crate::mapreduce::partition::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Valid log levels for configuration
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Prefix of every environment variable read by [`JobConfig::apply_env`]
pub const ENV_PREFIX: &str = "MAPMUL_";

/// Settings for one multiplication job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Partitioning strategy, or `auto` to pick one from shapes and sparsity
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Run the partial aggregator on every map worker
    #[serde(default = "default_combiner")]
    pub combiner: bool,

    /// Skip zero inputs and omit zero-valued output cells
    #[serde(default)]
    pub skip_zeros: bool,

    /// Maximum number of tasks running at once
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Number of reducer partitions keys are hashed into
    #[serde(default = "default_reduce_partitions")]
    pub reduce_partitions: usize,

    /// Rows of one operand handled by a single map task
    #[serde(default = "default_split_rows")]
    pub split_rows: usize,

    /// Reruns allowed for a task failing with a transient storage error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            combiner: default_combiner(),
            skip_zeros: false,
            max_parallel: default_max_parallel(),
            reduce_partitions: default_reduce_partitions(),
            split_rows: default_split_rows(),
            max_retries: default_max_retries(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions for serde
fn default_combiner() -> bool {
    true
}

fn default_max_parallel() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_reduce_partitions() -> usize {
    default_max_parallel()
}

fn default_split_rows() -> usize {
    64
}

fn default_max_retries() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub strategy: Option<StrategyKind>,
    pub combiner: Option<bool>,
    pub skip_zeros: Option<bool>,
    pub max_parallel: Option<usize>,
    pub log_level: Option<String>,
}

impl JobConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorCode::CONFIG_NOT_FOUND
            } else {
                ErrorCode::CONFIG_GENERIC
            };
            MapmulError::config_with_code(
                code,
                format!("cannot read configuration file {}", path.display()),
            )
            .with_source(e)
        })?;

        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("in {}", path.display())))
    }

    /// Apply `MAPMUL_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `MAPMUL_*` variables resolved through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("STRATEGY") {
            self.strategy = parse_env("STRATEGY", &value)?;
        }
        if let Some(value) = var("COMBINER") {
            self.combiner = parse_env_bool("COMBINER", &value)?;
        }
        if let Some(value) = var("SKIP_ZEROS") {
            self.skip_zeros = parse_env_bool("SKIP_ZEROS", &value)?;
        }
        if let Some(value) = var("MAX_PARALLEL") {
            self.max_parallel = parse_env("MAX_PARALLEL", &value)?;
        }
        if let Some(value) = var("REDUCE_PARTITIONS") {
            self.reduce_partitions = parse_env("REDUCE_PARTITIONS", &value)?;
        }
        if let Some(value) = var("SPLIT_ROWS") {
            self.split_rows = parse_env("SPLIT_ROWS", &value)?;
        }
        if let Some(value) = var("MAX_RETRIES") {
            self.max_retries = parse_env("MAX_RETRIES", &value)?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.log_level = value.trim().to_ascii_lowercase();
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(strategy) = overrides.strategy {
            self.strategy = strategy;
        }
        if let Some(combiner) = overrides.combiner {
            self.combiner = combiner;
        }
        if let Some(skip_zeros) = overrides.skip_zeros {
            self.skip_zeros = skip_zeros;
        }
        if let Some(max_parallel) = overrides.max_parallel {
            self.max_parallel = max_parallel;
        }
        if let Some(log_level) = &overrides.log_level {
            self.log_level = log_level.clone();
        }
    }

    /// Check every setting, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.max_parallel == 0 {
            errors.push("max_parallel must be at least 1".to_string());
        }
        if self.reduce_partitions == 0 {
            errors.push("reduce_partitions must be at least 1".to_string());
        }
        if self.split_rows == 0 {
            errors.push("split_rows must be at least 1".to_string());
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level '{}' must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MapmulError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                errors.join("; "),
            ))
        }
    }

    /// Build the effective configuration from every layer
    pub async fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.apply_overrides(overrides);
        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        MapmulError::config_with_code(
            ErrorCode::CONFIG_INVALID_ENV,
            format!("{}{} has invalid value '{}'", ENV_PREFIX, name, value),
        )
    })
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MapmulError::config_with_code(
            ErrorCode::CONFIG_INVALID_ENV,
            format!("{}{} must be a boolean, got '{}'", ENV_PREFIX, name, value),
        )),
    }
}
