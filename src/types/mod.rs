//! Shared data structures for the harmonic compliance pipeline
//!
//! - `table`: raw worksheets, the cleaned trend table, harmonic tables
//! - `limits`: IEEE 519 voltage and current limit tables
//! - `report`: verdicts, summary statistics, chart series, the final report

mod table;
// Public so the static tables stay reachable as `types::limits::*`
pub mod limits;
mod report;

pub use table::*;
pub use limits::{
    CurrentLimitRow, OrderClass, VoltageBand, VoltageLimitRow, CURRENT_LIMITS,
    CURRENT_LIMITS_MAX_NOMINAL_VOLTAGE, VOLTAGE_LIMITS,
};
pub use report::*;
