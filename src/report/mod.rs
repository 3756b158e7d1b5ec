//! Report assembly
//!
//! - `assembler`: summary statistics, trend and bar chart series, final report
//! - `recommendations`: advisory text rules

pub mod assembler;
pub mod recommendations;

pub use assembler::{assemble, bar_chart, summary_stats, trend_data, Headline, ReportParts};
pub use recommendations::{generate_recommendations, RecommendationInputs};
