//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `HEALTHGRAPH_*` environment overrides.

use crate::anomaly::{AnomalyConfig, MIN_BASELINE_POINTS};
use crate::correlation::CorrelationConfig;
use crate::patterns::CascadeConfig;
use crate::score::{RecommenderConfig, ScoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub cascade: CascadeConfig,

    #[serde(default)]
    pub weekly: WeeklyConfig,

    #[serde(default)]
    pub score: ScoreConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weekly pattern reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyConfig {
    /// Peak-to-trough swing, as % of the mean, needed to report a metric
    #[serde(default = "default_min_variation")]
    pub min_variation_percent: f64,
}

fn default_min_variation() -> f64 {
    15.0
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            min_variation_percent: default_min_variation(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("healthgraph").join("config.toml")),
            Some(PathBuf::from("./healthgraph.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check values the analyses cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if !(0.0..1.0).contains(&self.correlation.min_correlation) {
            return Err(invalid("correlation.min_correlation", "must be in [0, 1)"));
        }
        if self.anomaly.threshold <= 0.0 {
            return Err(invalid("anomaly.threshold", "must be positive"));
        }
        if self.anomaly.baseline_days < MIN_BASELINE_POINTS {
            return Err(ConfigError::Invalid {
                field: "anomaly.baseline_days".to_string(),
                reason: format!("must be at least {}", MIN_BASELINE_POINTS),
            });
        }
        if self.anomaly.rolling_window < 2 {
            return Err(invalid("anomaly.rolling_window", "must be at least 2"));
        }
        if self.score.target_score > 100 {
            return Err(invalid("score.target_score", "must be at most 100"));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("logging.format", "must be \"pretty\" or \"json\""));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `HEALTHGRAPH_*` overrides from any key lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Unparseable numbers are ignored
        let var = |key: &str| -> Option<String> { lookup(key).map(|v| v.trim().to_string()) };

        if let Some(v) = parse_value(var("HEALTHGRAPH_MIN_CORRELATION")) {
            self.correlation.min_correlation = v;
        }
        if let Some(v) = parse_value(var("HEALTHGRAPH_MAX_LAG")) {
            self.correlation.max_lag = v;
        }
        if let Some(v) = parse_value(var("HEALTHGRAPH_ANOMALY_THRESHOLD")) {
            self.anomaly.threshold = v;
        }
        if let Some(v) = parse_value(var("HEALTHGRAPH_BASELINE_DAYS")) {
            self.anomaly.baseline_days = v;
        }
        if let Some(v) = parse_value(var("HEALTHGRAPH_TARGET_SCORE")) {
            self.score.target_score = v;
        }

        if let Some(url) = var("HEALTHGRAPH_RECOMMENDER_URL").filter(|u| !u.is_empty()) {
            self.recommender.url = Some(url);
            self.recommender.enabled = true;
        }

        if let Some(level) = var("HEALTHGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("HEALTHGRAPH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn parse_value<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|v| v.parse().ok())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# healthgraph configuration
#
# Environment variables override these settings:
# - HEALTHGRAPH_MIN_CORRELATION
# - HEALTHGRAPH_MAX_LAG
# - HEALTHGRAPH_ANOMALY_THRESHOLD
# - HEALTHGRAPH_BASELINE_DAYS
# - HEALTHGRAPH_TARGET_SCORE
# - HEALTHGRAPH_RECOMMENDER_URL
# - HEALTHGRAPH_LOG_LEVEL
# - HEALTHGRAPH_LOG_FORMAT

[correlation]
# Minimum |r| for a correlation to be reported
min_correlation = 0.3

# Largest lag searched, in days
max_lag = 3

[anomaly]
# Leading valid values used as the baseline (at least 10)
baseline_days = 14

# Trailing window for the rolling baseline
rolling_window = 7

# z-score a day must exceed
threshold = 1.8

# Lower bound on the consecutive days a run needs
min_consecutive = 2

# Baseline method: fixed or rolling
method = "fixed"

# Findings returned after ranking
max_findings = 3

[cascade]
# Longest cascade path, in edges
max_hops = 3

# Cascades returned
max_cascades = 10

[weekly]
# Minimum peak-to-trough swing, as % of the mean
min_variation_percent = 15.0

[score]
# Target composite score for recommendations
target_score = 80

# Days a metric's last value is carried into a day's score
lookback_days = 3

[recommender]
# Use an external recommendation service (falls back to rules on failure)
enabled = false

# Service endpoint (POST, JSON)
# url = "http://localhost:8090/recommend"

# Request timeout (ms)
timeout_ms = 3000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/healthgraph/healthgraph.log"
"#
    .to_string()
}
