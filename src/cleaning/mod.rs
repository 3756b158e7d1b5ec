//! Input cleaning
//!
//! - `coercion`: raw cells to finite numbers (never fails)
//! - `timestamps`: calendar conversion, timestamp parsing, deduplication

pub mod coercion;
pub mod timestamps;

pub use coercion::{coerce_cell, coerce_column, finite_or_zero};
pub use timestamps::{convert_calendar_year, normalize_trend, parse_timestamp, NormalizeStats};
