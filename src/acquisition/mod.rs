//! Worksheet acquisition
//!
//! Loads logger worksheets exported as CSV into raw tables.

pub mod csv_tables;

pub use csv_tables::{load_table, load_workbook, CsvLayout, TableLoadError};
