//! Analysis pipeline - one compliance run from raw worksheets to report
//!
//! ```text
//! STAGE 1: Table check        (missing worksheet is the only error)
//! STAGE 2: Trend cleaning     (calendar conversion, parse, dedupe, coerce)
//! STAGE 3: Percentiles        (THD instant + windowed, individual harmonics)
//! STAGE 4: Limits             (voltage band, Isc/Il band)
//! STAGE 5: Derived metrics    (TDD, power factor)
//! STAGE 6: Compliance         (all rules, failing points)
//! STAGE 7: Report             (summary, charts, recommendations)
//! ```
//!
//! The run is synchronous and holds no shared state; callers on an async
//! runtime dispatch it to a blocking worker.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cleaning::{normalize_trend, timestamps::DEFAULT_CALENDAR_YEAR_OFFSET};
use crate::compliance::{self, ComplianceInputs};
use crate::config::AnalysisConfig;
use crate::limits::ResolvedLimits;
use crate::power_metrics::{average_power_factor, total_demand_distortion};
use crate::report::{self, recommendations::DEFAULT_POWER_FACTOR_TARGET};
use crate::statistics::{mean, HarmonicPercentiles, ThdPercentiles};
use crate::types::{
    AnalysisReport, HarmonicSubject, HarmonicTable, InputTables, RawTable, CURRENT_HARMONIC_TABLE,
    TREND_TABLE, VOLTAGE_HARMONIC_TABLE,
};

/// Default sustained-level window (minutes)
pub const DEFAULT_WINDOW_MINUTES: u32 = 10;

// ============================================================================
// Inputs
// ============================================================================

/// Errors the engine raises. Data-quality problems are absorbed, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Required worksheet '{0}' not found")]
    MissingTable(String),
}

/// Caller-supplied electrical parameters at the PCC
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    /// Nominal system voltage (V)
    pub nominal_voltage: f64,
    /// Short-circuit current (A)
    pub isc: f64,
    /// Maximum demand load current (A)
    pub il: f64,
}

/// Engine tuning for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub window_minutes: u32,
    pub calendar_year_offset: i32,
    pub power_factor_target: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            calendar_year_offset: DEFAULT_CALENDAR_YEAR_OFFSET,
            power_factor_target: DEFAULT_POWER_FACTOR_TARGET,
        }
    }
}

impl From<&AnalysisConfig> for AnalysisSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            window_minutes: config.sustained_window_minutes,
            calendar_year_offset: config.calendar_year_offset,
            power_factor_target: config.power_factor_target,
        }
    }
}

impl AnalysisSettings {
    fn window_secs(&self) -> i64 {
        i64::from(self.window_minutes.max(1)) * 60
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Stateless compliance engine
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerQualityAnalyzer {
    settings: AnalysisSettings,
}

impl PowerQualityAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    /// Run every stage over the three worksheets.
    ///
    /// Fails only when a required worksheet is absent; every other input
    /// problem degrades to dropped rows or zeros.
    pub fn analyze(
        &self,
        tables: &InputTables,
        params: &SystemParameters,
    ) -> Result<AnalysisReport, AnalysisError> {
        // STAGE 1: Table check
        let trend_raw = required(tables, TREND_TABLE)?;
        let vh_raw = required(tables, VOLTAGE_HARMONIC_TABLE)?;
        let ah_raw = required(tables, CURRENT_HARMONIC_TABLE)?;

        // STAGE 2: Trend cleaning
        let (trend, stats) = normalize_trend(trend_raw, self.settings.calendar_year_offset);
        let voltage_table = HarmonicTable::from_raw(vh_raw, HarmonicSubject::Voltage);
        let current_table = HarmonicTable::from_raw(ah_raw, HarmonicSubject::Current);
        debug!(
            trend_rows = trend.len(),
            dropped = stats.unparseable_rows,
            duplicates = stats.duplicate_rows,
            vh_series = voltage_table.len(),
            ah_series = current_table.len(),
            "Input tables prepared"
        );

        // STAGE 3: Percentiles
        let window_secs = self.settings.window_secs();
        let voltage_thd = ThdPercentiles::compute(&trend, HarmonicSubject::Voltage, window_secs);
        let current_thd = ThdPercentiles::compute(&trend, HarmonicSubject::Current, window_secs);
        let voltage_harmonics = HarmonicPercentiles::compute(&voltage_table);
        let current_harmonics = HarmonicPercentiles::compute(&current_table);

        // STAGE 4: Limits
        let limits = ResolvedLimits::resolve(params.nominal_voltage, params.isc, params.il);

        // STAGE 5: Derived metrics
        let thdv = voltage_thd.phase(1).p95_window;
        let thdi = current_thd.phase(1).p95_window;
        let avg_current = trend.channel("A1 RMS").map_or(0.0, mean);
        let tdd = total_demand_distortion(thdi, avg_current, params.il);
        let power_factor = match (trend.channel("W Total"), trend.channel("VA Total")) {
            (Some(w), Some(va)) => average_power_factor(w, va),
            _ => None,
        };

        // STAGE 6: Compliance
        let outcome = compliance::evaluate(&ComplianceInputs {
            limits: &limits,
            voltage_thd: &voltage_thd,
            current_thd: &current_thd,
            voltage_harmonics: &voltage_harmonics,
            current_harmonics: &current_harmonics,
            tdd,
            window_minutes: self.settings.window_minutes,
        });

        // STAGE 7: Report
        let recommendations = report::generate_recommendations(&report::RecommendationInputs {
            voltage: outcome.voltage,
            current: outcome.current,
            power_factor,
            power_factor_target: self.settings.power_factor_target,
        });
        let summary_stats = report::summary_stats(
            &trend,
            &report::Headline {
                thdv_percent: thdv,
                thdi_percent: thdi,
                power_factor,
            },
        );

        info!(
            rows = trend.len(),
            thdv_percent = thdv,
            tdd_percent = tdd,
            voltage = %outcome.voltage,
            current = %outcome.current,
            "Analysis complete"
        );

        Ok(report::assemble(report::ReportParts {
            thdv_percent: thdv,
            tdd_percent: tdd,
            summary_stats,
            bar_chart_data: report::bar_chart(&voltage_harmonics, &current_harmonics),
            trend_data: report::trend_data(&trend),
            compliance: outcome,
            recommendations,
        }))
    }
}

fn required<'a>(tables: &'a InputTables, name: &str) -> Result<&'a RawTable, AnalysisError> {
    tables
        .get(name)
        .ok_or_else(|| AnalysisError::MissingTable(name.to_string()))
}
