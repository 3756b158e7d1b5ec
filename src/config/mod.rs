//! Analyzer Configuration Module
//!
//! TOML configuration for the compliance engine, the CSV loader and the HTTP
//! server.
//!
//! ## Loading Order
//!
//! 1. `PQ_CONFIG` environment variable (path to TOML file)
//! 2. `pq_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(AnalyzerConfig::load());
//!
//! // At the boundary:
//! let settings = AnalysisSettings::from(&config::get().analysis);
//! ```
//!
//! The engine itself never reads the global; it receives `AnalysisSettings`.

mod analyzer_config;

pub use analyzer_config::*;

use std::sync::OnceLock;

/// Global analyzer configuration, initialized once at startup.
static ANALYZER_CONFIG: OnceLock<AnalyzerConfig> = OnceLock::new();

/// Initialize the global analyzer configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: AnalyzerConfig) {
    if ANALYZER_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global analyzer configuration.
///
/// Falls back to built-in defaults when `init()` has not been called.
pub fn get() -> &'static AnalyzerConfig {
    ANALYZER_CONFIG.get_or_init(AnalyzerConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ANALYZER_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_falls_back_to_defaults() {
        let config = get();
        assert!(is_initialized());
        assert_eq!(config.analysis, AnalysisConfig::default());
    }
}
