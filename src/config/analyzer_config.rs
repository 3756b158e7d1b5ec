//! Analyzer configuration - engine tuning, input layout and server settings
//!
//! Every section implements `Default` with the values the engine uses when no
//! config file is present, so an empty or partial TOML file is always valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PQ_CONFIG";
/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "pq_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AnalyzerConfig::load()` which searches:
/// 1. `$PQ_CONFIG` env var
/// 2. `./pq_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Compliance engine tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// CSV export layout
    #[serde(default)]
    pub input: InputConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl AnalyzerConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PQ_CONFIG` environment variable
    /// 2. `./pq_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analyzer config from PQ_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PQ_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PQ_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./pq_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analyzer config from ./pq_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./pq_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No pq_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section, collecting all problems.
    ///
    /// Rules:
    /// - The sustained window must be at least one minute
    /// - The power-factor target must lie in (0, 1]
    /// - The server address must be non-empty and the body limit positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let a = &self.analysis;

        if a.sustained_window_minutes == 0 {
            errors.push("analysis.sustained_window_minutes must be > 0".to_string());
        }
        if !a.power_factor_target.is_finite()
            || a.power_factor_target <= 0.0
            || a.power_factor_target > 1.0
        {
            errors.push(format!(
                "analysis.power_factor_target ({}) must be in (0, 1]",
                a.power_factor_target
            ));
        }
        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be > 0".to_string());
        }
        for origin in &self.server.cors_origins {
            if origin.trim().is_empty() {
                errors.push("server.cors_origins must not contain empty entries".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Analysis
// ============================================================================

/// Compliance engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of the sustained-level resampling window (minutes)
    pub sustained_window_minutes: u32,

    /// Years added by the logger calendar (Thai solar calendar: 543)
    pub calendar_year_offset: i32,

    /// Power factor below which correction is recommended
    pub power_factor_target: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sustained_window_minutes: 10,
            calendar_year_offset: 543,
            power_factor_target: 0.95,
        }
    }
}

// ============================================================================
// Input
// ============================================================================

/// Layout of the CSV exports.
///
/// Logger software often writes a title line above the header and a units row
/// below it on the Trend sheet. Harmonic sheets always have the header first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Zero-based line holding the Trend column names
    pub trend_header_row: usize,

    /// Lines between the Trend header and the first data row
    pub trend_skip_rows_after_header: usize,
}

// ============================================================================
// Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Origins allowed by CORS; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AnalyzerConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.analysis.sustained_window_minutes, 10);
        assert_eq!(config.analysis.calendar_year_offset, 543);
        assert_eq!(config.server.max_body_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[analysis]
power_factor_target = 0.9

[server]
cors_origins = ["http://localhost:5173"]
"#;
        let config: AnalyzerConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.analysis.power_factor_target, 0.9);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        // Non-overridden values retain defaults
        assert_eq!(config.analysis.sustained_window_minutes, 10);
        assert_eq!(config.server.addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = AnalyzerConfig::default();
        config.analysis.sustained_window_minutes = 0;
        config.analysis.power_factor_target = 1.5;
        config.server.addr = " ".to_string();
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "got {:?}", errors);
                assert!(errors.iter().any(|e| e.contains("sustained_window_minutes")));
                assert!(errors.iter().any(|e| e.contains("power_factor_target")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_power_factor_target_rejected() {
        let mut config = AnalyzerConfig::default();
        config.analysis.power_factor_target = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = AnalyzerConfig::default();
        config.input.trend_header_row = 2;
        let toml_str = config.to_toml().expect("serialization should work");
        let roundtripped: AnalyzerConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(config, roundtripped);
    }
}
