//! Percentile aggregation of distortion series
//!
//! Two modes:
//! - **THD** (per phase): 99th percentile over every instantaneous sample, plus a
//!   two-stage percentile-of-percentiles: 95th percentile inside each fixed
//!   window, then the 95th/99th percentile across the windows.
//! - **Individual harmonics** (orders 2-50, per phase): one 95th percentile over
//!   the raw samples.
//!
//! All percentiles use linear interpolation between order statistics
//! (`rank = p/100 * (n - 1)`), the default of most dataframe libraries.
//! Empty input yields 0.0.

use chrono::NaiveDateTime;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::types::{harmonic_orders, HarmonicSubject, HarmonicTable, TimeSeriesTable, PHASES};

/// Percentile of the instantaneous samples
pub const INSTANT_PERCENTILE: f64 = 99.0;
/// Percentile taken inside each window, and the sustained cross-window percentile
pub const WINDOW_PERCENTILE: f64 = 95.0;
/// Upper cross-window percentile
pub const WINDOW_UPPER_PERCENTILE: f64 = 99.0;
/// Individual harmonic percentile
pub const HARMONIC_PERCENTILE: f64 = 95.0;

// ============================================================================
// Scalar helpers
// ============================================================================

/// Linear-interpolated percentile (`pct` in 0..=100); 0.0 for empty input.
///
/// Non-finite samples are ignored, so an all-NaN series is also 0.0.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, pct)
}

fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Arithmetic mean; 0.0 for empty or all-NaN input
pub fn mean(values: &[f64]) -> f64 {
    let m = values.iter().filter(|v| v.is_finite()).mean();
    if m.is_finite() {
        m
    } else {
        0.0
    }
}

/// Maximum; 0.0 for empty input
pub fn max(values: &[f64]) -> f64 {
    let m = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if m.is_finite() {
        m
    } else {
        0.0
    }
}

/// Last sample (cumulative counters); 0.0 for empty input
pub fn last(values: &[f64]) -> f64 {
    values.last().copied().filter(|v| v.is_finite()).unwrap_or(0.0)
}

// ============================================================================
// Window resampling
// ============================================================================

/// Group samples into fixed windows aligned to the epoch and take a percentile
/// inside each window. Windows without samples produce no entry.
///
/// Returned in chronological window order.
pub fn resample_percentile(
    timestamps: &[NaiveDateTime],
    values: &[f64],
    window_secs: i64,
    pct: f64,
) -> Vec<f64> {
    if window_secs <= 0 {
        return Vec::new();
    }
    let mut windows: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (ts, value) in timestamps.iter().zip(values) {
        let bucket = ts.and_utc().timestamp().div_euclid(window_secs);
        windows.entry(bucket).or_default().push(*value);
    }
    windows
        .into_values()
        .map(|samples| percentile(&samples, pct))
        .collect()
}

// ============================================================================
// THD percentiles
// ============================================================================

/// Percentile set of one THD channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PercentileSet {
    /// 99th percentile over instantaneous samples
    pub p99_instant: f64,
    /// 95th percentile across window 95th percentiles
    pub p95_window: f64,
    /// 99th percentile across window 95th percentiles
    pub p99_window: f64,
}

impl PercentileSet {
    /// Compute both aggregation modes over one series
    pub fn compute(timestamps: &[NaiveDateTime], values: &[f64], window_secs: i64) -> Self {
        let windows = resample_percentile(timestamps, values, window_secs, WINDOW_PERCENTILE);
        Self {
            p99_instant: percentile(values, INSTANT_PERCENTILE),
            p95_window: percentile(&windows, WINDOW_PERCENTILE),
            p99_window: percentile(&windows, WINDOW_UPPER_PERCENTILE),
        }
    }
}

/// THD percentile sets for the three phases of one subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThdPercentiles {
    by_phase: BTreeMap<u8, PercentileSet>,
}

impl ThdPercentiles {
    /// Compute for every `{U|A}{phase} THD` channel present in the trend table
    pub fn compute(table: &TimeSeriesTable, subject: HarmonicSubject, window_secs: i64) -> Self {
        let by_phase = PHASES
            .iter()
            .filter_map(|&phase| {
                let values = table.channel(&subject.thd_channel(phase))?;
                Some((phase, PercentileSet::compute(table.timestamps(), values, window_secs)))
            })
            .collect();
        Self { by_phase }
    }

    /// Percentile set of a phase; zeros when the channel was absent
    pub fn phase(&self, phase: u8) -> PercentileSet {
        self.by_phase.get(&phase).copied().unwrap_or_default()
    }
}

// ============================================================================
// Individual harmonic percentiles
// ============================================================================

/// 95th percentiles of individual harmonic series keyed by (phase, order)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarmonicPercentiles {
    values: BTreeMap<(u8, u8), f64>,
}

impl HarmonicPercentiles {
    /// Compute for every (phase, order) series present; absent ones are skipped
    pub fn compute(table: &HarmonicTable) -> Self {
        let mut values = BTreeMap::new();
        for order in harmonic_orders() {
            for phase in PHASES {
                if let Some(series) = table.series(phase, order) {
                    values.insert((phase, order), percentile(series, HARMONIC_PERCENTILE));
                }
            }
        }
        Self { values }
    }

    /// Percentile of a combination, `None` when the worksheet lacked it
    pub fn get(&self, phase: u8, order: u8) -> Option<f64> {
        self.values.get(&(phase, order)).copied()
    }

    /// Mean over the phases that reported an order; 0.0 if none did
    pub fn phase_average(&self, order: u8) -> f64 {
        let available: Vec<f64> = PHASES.iter().filter_map(|&p| self.get(p, order)).collect();
        mean(&available)
    }
}
