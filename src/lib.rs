//! PQ Analyzer: IEEE 519-2022 harmonic compliance
//!
//! Evaluates power-quality logger exports against the IEEE 519-2022 harmonic
//! distortion limits and reports pass/fail compliance with supporting statistics.
//!
//! ## Architecture
//!
//! - **Cleaning**: numeric coercion and Thai-calendar timestamp normalization
//! - **Statistics**: instant and windowed THD percentiles, individual harmonic percentiles
//! - **Limits**: IEEE 519 voltage and current limit tables and their resolution
//! - **Compliance**: rule evaluation and grouped failing points
//! - **Report**: summary statistics, chart series and recommendations
//! - **Analysis**: the pipeline tying the stages together
//!
//! CSV loading, configuration and the HTTP API sit around the engine.

pub mod acquisition;
pub mod analysis;
pub mod api;
pub mod cleaning;
pub mod compliance;
pub mod config;
pub mod limits;
pub mod power_metrics;
pub mod report;
pub mod statistics;
pub mod types;

// Re-export configuration
pub use config::AnalyzerConfig;

// Re-export the engine entry points
pub use analysis::{AnalysisError, AnalysisSettings, PowerQualityAnalyzer, SystemParameters};

// Re-export commonly used types
pub use compliance::{FailingPoint, FailingPoints};
pub use types::{AnalysisReport, CellValue, InputTables, RawTable, Verdict};
