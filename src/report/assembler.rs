//! Report assembly: summary statistics, chart series and the final report

use crate::compliance::ComplianceOutcome;
use crate::statistics::{last, max, mean, HarmonicPercentiles};
use crate::types::{
    harmonic_orders, AnalysisReport, BarChartData, ChannelSeries, SummaryStats, TimeSeriesTable,
    TrendData,
};

/// Timestamp format of `trend_data.timestamps`
pub const TREND_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Summary statistics
// ============================================================================

/// Headline figures the summary carries alongside the trend statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Headline {
    /// Phase-1 voltage THD, window p95
    pub thdv_percent: f64,
    /// Phase-1 current THD, window p95
    pub thdi_percent: f64,
    pub power_factor: Option<f64>,
}

pub fn summary_stats(table: &TimeSeriesTable, headline: &Headline) -> SummaryStats {
    let avg = |name: &str| table.channel(name).map_or(0.0, mean);
    let peak = |name: &str| table.channel(name).map_or(0.0, max);
    let total = |name: &str| table.channel(name).map_or(0.0, last);

    SummaryStats {
        u1_rms_avg: avg("U1 RMS"),
        u2_rms_avg: avg("U2 RMS"),
        u3_rms_avg: avg("U3 RMS"),
        v1_rms_avg: avg("V1 RMS"),
        v2_rms_avg: avg("V2 RMS"),
        v3_rms_avg: avg("V3 RMS"),
        a1_rms_avg: avg("A1 RMS"),
        a2_rms_avg: avg("A2 RMS"),
        a3_rms_avg: avg("A3 RMS"),
        a1_rms_max: peak("A1 RMS"),
        a2_rms_max: peak("A2 RMS"),
        a3_rms_max: peak("A3 RMS"),
        active_power_avg: avg("W Total"),
        reactive_power_avg: avg("var Total"),
        apparent_power_avg: avg("VA Total"),
        active_energy_total: total("Wh Total"),
        reactive_energy_total: total("varh Total"),
        apparent_energy_total: total("VAh Total"),
        thdv_percent_avg: finite(headline.thdv_percent),
        thdi_percent_avg: finite(headline.thdi_percent),
        power_factor_avg: headline.power_factor.map_or(0.0, finite),
    }
}

fn finite(value: f64) -> f64 {
    crate::cleaning::finite_or_zero(value)
}

// ============================================================================
// Chart series
// ============================================================================

fn group(table: &TimeSeriesTable, channels: &[&str]) -> ChannelSeries {
    channels
        .iter()
        .map(|name| {
            let series = table
                .channel_or_zeros(name)
                .into_iter()
                .map(finite)
                .collect();
            (name.to_string(), series)
        })
        .collect()
}

/// Regroup the cleaned trend channels by physical quantity.
///
/// Absent channels are zero-filled so every series matches `timestamps` in length.
pub fn trend_data(table: &TimeSeriesTable) -> TrendData {
    TrendData {
        timestamps: table
            .timestamps()
            .iter()
            .map(|ts| ts.format(TREND_TIMESTAMP_FORMAT).to_string())
            .collect(),
        voltage_ll: group(table, &["U1 RMS", "U2 RMS", "U3 RMS"]),
        voltage_ln: group(table, &["V1 RMS", "V2 RMS", "V3 RMS"]),
        current: group(table, &["A1 RMS", "A2 RMS", "A3 RMS"]),
        active_power: group(table, &["W Total"]),
        reactive_power: group(table, &["var Total"]),
        apparent_power: group(table, &["VA Total"]),
        active_energy: group(table, &["Wh Total"]),
        reactive_energy: group(table, &["varh Total"]),
        apparent_energy: group(table, &["VAh Total"]),
        thdv_percent: group(table, &["U1 THD", "U2 THD", "U3 THD"]),
        thdi_percent: group(table, &["A1 THD", "A2 THD", "A3 THD"]),
        power_factor: group(table, &["PF1", "PF2", "PF3", "PF Mean"]),
        unbalance: group(table, &["Vunb", "Aunb"]),
    }
}

/// One bar per harmonic order, averaged over the phases that reported it
pub fn bar_chart(voltage: &HarmonicPercentiles, current: &HarmonicPercentiles) -> BarChartData {
    let labels: Vec<u8> = harmonic_orders().collect();
    BarChartData {
        vh_data: labels.iter().map(|&h| voltage.phase_average(h)).collect(),
        ah_data: labels.iter().map(|&h| current.phase_average(h)).collect(),
        labels,
    }
}

// ============================================================================
// Final assembly
// ============================================================================

/// Everything the report is built from
pub struct ReportParts {
    pub thdv_percent: f64,
    pub tdd_percent: f64,
    pub summary_stats: SummaryStats,
    pub compliance: ComplianceOutcome,
    pub bar_chart_data: BarChartData,
    pub trend_data: TrendData,
    pub recommendations: Vec<String>,
}

pub fn assemble(parts: ReportParts) -> AnalysisReport {
    AnalysisReport {
        thdv_percent: finite(parts.thdv_percent),
        tdd_percent: finite(parts.tdd_percent),
        summary_stats: parts.summary_stats,
        voltage_compliance: parts.compliance.voltage,
        current_compliance: parts.compliance.current,
        failing_points: parts.compliance.failing_points,
        bar_chart_data: parts.bar_chart_data,
        trend_data: parts.trend_data,
        recommendations: parts.recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, HarmonicSubject, HarmonicTable, RawTable};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn table(channels: &[(&str, Vec<f64>)]) -> TimeSeriesTable {
        let n = channels.first().map_or(0, |(_, v)| v.len());
        let start = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let timestamps = (0..n as i64)
            .map(|i| start + chrono::Duration::seconds(i * 3))
            .collect();
        let channels: BTreeMap<_, _> = channels
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        TimeSeriesTable::from_parts(timestamps, channels)
    }

    #[test]
    fn test_summary_stats_from_channels() {
        let t = table(&[
            ("A1 RMS", vec![10.0, 30.0, 20.0]),
            ("Wh Total", vec![100.0, 150.0, 175.0]),
        ]);
        let stats = summary_stats(
            &t,
            &Headline {
                thdv_percent: 2.5,
                thdi_percent: f64::NAN,
                power_factor: Some(0.9),
            },
        );
        assert!((stats.a1_rms_avg - 20.0).abs() < 1e-12);
        assert_eq!(stats.a1_rms_max, 30.0);
        assert_eq!(stats.active_energy_total, 175.0);
        assert_eq!(stats.u1_rms_avg, 0.0, "absent channel reads as zero");
        assert_eq!(stats.thdv_percent_avg, 2.5);
        assert_eq!(stats.thdi_percent_avg, 0.0);
        assert_eq!(stats.power_factor_avg, 0.9);
    }

    #[test]
    fn test_unmeasured_power_factor_reports_zero() {
        let stats = summary_stats(&table(&[]), &Headline::default());
        assert_eq!(stats.power_factor_avg, 0.0);
    }

    #[test]
    fn test_trend_data_zero_fills_absent_channels() {
        let t = table(&[("U1 RMS", vec![400.0, 401.0])]);
        let data = trend_data(&t);
        assert_eq!(data.timestamps, vec!["2024-03-15 08:00:00", "2024-03-15 08:00:03"]);
        assert_eq!(data.voltage_ll["U1 RMS"], vec![400.0, 401.0]);
        assert_eq!(data.voltage_ll["U2 RMS"], vec![0.0, 0.0]);
        assert_eq!(data.power_factor.len(), 4);
        assert_eq!(data.unbalance["Aunb"].len(), 2);
    }

    #[test]
    fn test_bar_chart_covers_every_order() {
        let raw = RawTable::new(
            vec!["V1h3".to_string(), "V2h3".to_string()],
            vec![vec![CellValue::Number(2.0), CellValue::Number(4.0)]],
        );
        let vh = HarmonicPercentiles::compute(&HarmonicTable::from_raw(&raw, HarmonicSubject::Voltage));
        let chart = bar_chart(&vh, &HarmonicPercentiles::default());
        assert_eq!(chart.labels.len(), 49);
        assert_eq!(chart.labels[0], 2);
        assert_eq!(chart.labels[48], 50);
        assert_eq!(chart.vh_data[1], 3.0);
        assert_eq!(chart.vh_data[0], 0.0);
        assert!(chart.ah_data.iter().all(|v| *v == 0.0));
    }
}
