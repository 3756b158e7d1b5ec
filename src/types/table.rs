//! Tabular inputs: raw worksheets, the cleaned trend table and harmonic tables

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::cleaning::coercion;

/// Worksheet holding the chronological trend channels
pub const TREND_TABLE: &str = "Trend";
/// Worksheet holding per-phase individual voltage harmonics (% of fundamental)
pub const VOLTAGE_HARMONIC_TABLE: &str = "Vh Harmonic %";
/// Worksheet holding per-phase individual current harmonics (% of fundamental)
pub const CURRENT_HARMONIC_TABLE: &str = "Ah Harmonic %";

/// All three worksheets, in the order they are checked for presence
pub const REQUIRED_TABLES: [&str; 3] = [TREND_TABLE, VOLTAGE_HARMONIC_TABLE, CURRENT_HARMONIC_TABLE];

/// Measurement phases
pub const PHASES: [u8; 3] = [1, 2, 3];

/// Lowest individual harmonic order evaluated
pub const MIN_HARMONIC_ORDER: u8 = 2;
/// Highest individual harmonic order evaluated
pub const MAX_HARMONIC_ORDER: u8 = 50;

/// Iterate harmonic orders 2..=50
pub fn harmonic_orders() -> impl Iterator<Item = u8> {
    MIN_HARMONIC_ORDER..=MAX_HARMONIC_ORDER
}

// ============================================================================
// Raw cells and worksheets
// ============================================================================

/// One raw spreadsheet cell as delivered by the loader.
///
/// Serialized untagged so JSON callers can send plain numbers, strings or `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Render the cell as text, the way a dataframe `astype(str)` would.
    ///
    /// Empty cells have no text and return `None`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Number(v) => Some(Cow::Owned(v.to_string())),
            CellValue::Empty => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// A worksheet as rows of cells under a header row.
///
/// Rows may be ragged; a missing trailing cell reads as [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched on trimmed header text
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim() == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&EMPTY_CELL)))
    }

    /// Cell at (row, column index), empty if the row is short
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// The named worksheets of one analysis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputTables {
    tables: HashMap<String, RawTable>,
}

impl InputTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        self.tables.insert(name.into(), table);
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, table: RawTable) -> Self {
        self.insert(name, table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.tables.get(name)
    }

    /// Names of required worksheets that are absent
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|name| !self.tables.contains_key(*name))
            .collect()
    }
}

// ============================================================================
// Cleaned trend table
// ============================================================================

/// Chronological trend channels after timestamp normalization.
///
/// Column-oriented: `timestamps[i]` is the instant of `channels[name][i]` for
/// every channel. Timestamps are non-decreasing and unique. Built once per
/// request by [`crate::cleaning::timestamps::normalize_trend`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesTable {
    timestamps: Vec<NaiveDateTime>,
    channels: BTreeMap<String, Vec<f64>>,
}

impl TimeSeriesTable {
    pub(crate) fn from_parts(
        timestamps: Vec<NaiveDateTime>,
        channels: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        debug_assert!(channels.values().all(|c| c.len() == timestamps.len()));
        Self { timestamps, channels }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Numeric samples of a channel, `None` if the worksheet lacks it
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// Channel samples, or zeros of table length when the channel is absent
    pub fn channel_or_zeros(&self, name: &str) -> Vec<f64> {
        self.channel(name)
            .map_or_else(|| vec![0.0; self.len()], <[f64]>::to_vec)
    }
}

// ============================================================================
// Harmonic tables
// ============================================================================

/// Which quantity a harmonic table measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmonicSubject {
    Voltage,
    Current,
}

impl HarmonicSubject {
    /// Column prefix of individual-harmonic columns (`V1h3`, `A2h5`)
    pub fn harmonic_prefix(self) -> char {
        match self {
            HarmonicSubject::Voltage => 'V',
            HarmonicSubject::Current => 'A',
        }
    }

    /// Prefix of the per-phase THD trend channels (`U1 THD`, `A1 THD`)
    pub fn thd_prefix(self) -> char {
        match self {
            HarmonicSubject::Voltage => 'U',
            HarmonicSubject::Current => 'A',
        }
    }

    pub fn thd_channel(self, phase: u8) -> String {
        format!("{}{} THD", self.thd_prefix(), phase)
    }

    /// Phase label used in failing-point reports for individual harmonics
    pub fn harmonic_phase_label(self, phase: u8) -> String {
        format!("{}{}", self.harmonic_prefix(), phase)
    }

    /// Phase label used in failing-point reports for THD rules
    pub fn thd_phase_label(self, phase: u8) -> String {
        format!("{}{}", self.thd_prefix(), phase)
    }
}

/// Individual-harmonic sample series keyed by (phase, order).
///
/// Only columns present in the worksheet appear; absent combinations are skipped
/// downstream rather than treated as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicTable {
    series: BTreeMap<(u8, u8), Vec<f64>>,
}

impl HarmonicTable {
    /// Pick the `{prefix}{phase}h{order}` columns out of a raw worksheet and coerce them.
    pub fn from_raw(raw: &RawTable, subject: HarmonicSubject) -> Self {
        let mut series = BTreeMap::new();
        for (idx, name) in raw.columns.iter().enumerate() {
            let Some(key) = parse_harmonic_column(name, subject.harmonic_prefix()) else {
                continue;
            };
            // First column wins when a header is repeated
            series.entry(key).or_insert_with(|| {
                coercion::coerce_column((0..raw.len()).map(|row| raw.cell(row, idx)))
            });
        }
        Self { series }
    }

    pub fn series(&self, phase: u8, order: u8) -> Option<&[f64]> {
        self.series.get(&(phase, order)).map(Vec::as_slice)
    }

    /// Number of (phase, order) series present
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Parse `V1h3` style headers into (phase, order), restricted to phases 1-3 and orders 2-50.
pub fn parse_harmonic_column(name: &str, prefix: char) -> Option<(u8, u8)> {
    let rest = name.trim().strip_prefix(prefix)?;
    let (phase, order) = rest.split_once('h')?;
    let phase: u8 = phase.parse().ok()?;
    let order: u8 = order.parse().ok()?;
    let valid = PHASES.contains(&phase) && (MIN_HARMONIC_ORDER..=MAX_HARMONIC_ORDER).contains(&order);
    valid.then_some((phase, order))
}
