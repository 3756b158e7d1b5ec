//! Analysis report: the single structured output of one compliance run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::compliance::FailingPoints;

/// Compliance verdict for one subject (voltage or current).
///
/// Starts at `Pass` and can only move to `Fail`; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    Pass,
    Fail,
}

impl Verdict {
    /// Permanently flip to `Fail`
    pub fn fail(&mut self) {
        *self = Verdict::Fail;
    }

    pub fn is_fail(self) -> bool {
        self == Verdict::Fail
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

/// Summary statistics over the cleaned trend table.
///
/// Averages and maxima are over every retained row (coerced cells count as zero);
/// energy totals are the last sample of the cumulative counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub u1_rms_avg: f64,
    pub u2_rms_avg: f64,
    pub u3_rms_avg: f64,
    pub v1_rms_avg: f64,
    pub v2_rms_avg: f64,
    pub v3_rms_avg: f64,
    pub a1_rms_avg: f64,
    pub a2_rms_avg: f64,
    pub a3_rms_avg: f64,
    pub a1_rms_max: f64,
    pub a2_rms_max: f64,
    pub a3_rms_max: f64,
    pub active_power_avg: f64,
    pub reactive_power_avg: f64,
    pub apparent_power_avg: f64,
    pub active_energy_total: f64,
    pub reactive_energy_total: f64,
    pub apparent_energy_total: f64,
    /// Phase-1 voltage THD, sustained-window 95th percentile
    pub thdv_percent_avg: f64,
    /// Phase-1 current THD, sustained-window 95th percentile
    pub thdi_percent_avg: f64,
    /// Mean of W/VA over rows with non-zero apparent power; 0 when unmeasurable
    pub power_factor_avg: f64,
}

/// Per-order bar chart series, each averaged over the phases that reported the order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarChartData {
    pub labels: Vec<u8>,
    pub vh_data: Vec<f64>,
    pub ah_data: Vec<f64>,
}

/// Channel name → samples, aligned with [`TrendData::timestamps`]
pub type ChannelSeries = BTreeMap<String, Vec<f64>>;

/// Trend series grouped by physical quantity for charting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendData {
    /// `%Y-%m-%d %H:%M:%S`
    pub timestamps: Vec<String>,
    pub voltage_ll: ChannelSeries,
    pub voltage_ln: ChannelSeries,
    pub current: ChannelSeries,
    pub active_power: ChannelSeries,
    pub reactive_power: ChannelSeries,
    pub apparent_power: ChannelSeries,
    pub active_energy: ChannelSeries,
    pub reactive_energy: ChannelSeries,
    pub apparent_energy: ChannelSeries,
    pub thdv_percent: ChannelSeries,
    pub thdi_percent: ChannelSeries,
    pub power_factor: ChannelSeries,
    pub unbalance: ChannelSeries,
}

/// Complete result of one analysis. Never mutated after assembly.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Headline voltage THD (phase 1, sustained-window 95th percentile)
    pub thdv_percent: f64,
    /// Total demand distortion (%)
    pub tdd_percent: f64,
    pub summary_stats: SummaryStats,
    pub voltage_compliance: Verdict,
    pub current_compliance: Verdict,
    pub failing_points: FailingPoints,
    pub bar_chart_data: BarChartData,
    pub trend_data: TrendData,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_is_monotone() {
        let mut v = Verdict::default();
        assert_eq!(v, Verdict::Pass);
        v.fail();
        v.fail();
        assert!(v.is_fail());
    }

    #[test]
    fn test_verdict_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"Pass\"");
        assert_eq!(serde_json::to_string(&Verdict::Fail).unwrap(), "\"Fail\"");
    }
}
