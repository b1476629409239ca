//! Configuration management for fps-analyzer

use crate::analysis::{SampleMode, UniquenessMethod};
use crate::error::{AnalyzerError, Result};
use crate::sink::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod watch;
pub use watch::ConfigWatcher;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Frame analysis configuration
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Output files configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Frame comparison strategy
    #[serde(default)]
    pub method: UniquenessMethod,

    /// Rows sampled for comparison
    #[serde(default)]
    pub sample_mode: SampleMode,

    /// Minimum share of changed ROI bytes (percent) for a new frame
    #[serde(default)]
    pub sensitivity_percent: f64,

    /// Enable tearing detection
    #[serde(default)]
    pub tearing_enabled: bool,

    /// Minimum share of changed bytes (percent) for a sampled row to count as updated
    #[serde(default = "default_tearing_sensitivity")]
    pub tearing_sensitivity_percent: f64,

    /// Seconds between snapshot flushes
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            method: UniquenessMethod::default(),
            sample_mode: SampleMode::default(),
            sensitivity_percent: 0.0,
            tearing_enabled: false,
            tearing_sensitivity_percent: default_tearing_sensitivity(),
            update_interval: default_update_interval(),
        }
    }
}

impl AnalyzerConfig {
    /// Flush interval in seconds; non-positive values fall back to 1s
    pub fn effective_update_interval(&self) -> f64 {
        if self.update_interval.is_finite() && self.update_interval > 0.0 {
            self.update_interval
        } else {
            default_update_interval()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.sensitivity_percent) {
            return Err(AnalyzerError::Config(
                "sensitivity_percent must be within 0..=100".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.tearing_sensitivity_percent) {
            return Err(AnalyzerError::Config(
                "tearing_sensitivity_percent must be within 0..=100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base path for the status (.txt) and history (.csv) files
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Truncate the history log at startup
    #[serde(default = "default_clear_history_on_start")]
    pub clear_history_on_start: bool,

    /// Records kept in the history log
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Prometheus textfile-collector output
    #[serde(default)]
    pub prometheus_textfile: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            clear_history_on_start: default_clear_history_on_start(),
            history_limit: default_history_limit(),
            prometheus_textfile: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AnalyzerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;

        if self.output.history_limit == 0 {
            return Err(AnalyzerError::Config("history_limit must be non-zero".into()));
        }

        Ok(())
    }
}

fn default_tearing_sensitivity() -> f64 {
    1.0
}

fn default_update_interval() -> f64 {
    1.0
}

fn default_clear_history_on_start() -> bool {
    true
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
