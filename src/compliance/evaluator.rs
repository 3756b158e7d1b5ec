//! IEEE 519 rule evaluation
//!
//! Every rule is checked independently; a violation flips the subject's verdict
//! to `Fail` and upserts a failing point. Nothing short-circuits, so the failing
//! point collection lists every rule that tripped.
//!
//! | Category                       | Rule                                        |
//! |--------------------------------|---------------------------------------------|
//! | Voltage THD (per phase)        | instant p99 > 1.5 × THD limit               |
//! |                                | window p95 > THD limit                      |
//! | Individual Voltage Harmonics   | p95 > individual limit (orders 2-50)        |
//! | Current TDD                    | TDD > TDD limit                             |
//! | Current THD (per phase)        | instant p99 > 2 × TDD limit                 |
//! |                                | window p95 > TDD limit                      |
//! |                                | window p99 > 1.5 × TDD limit                |
//! | Individual Current Harmonics   | p95 > order-class limit (orders 2-50)       |
//!
//! Individual-harmonic violations are keyed per order (`Harmonic 5 > limit`),
//! with every failing phase of that order merged into the one point.
//!
//! Current rules only run when a current limit row applies.

use tracing::{debug, info};

use super::failing_points::FailingPoints;
use crate::limits::ResolvedLimits;
use crate::statistics::{HarmonicPercentiles, ThdPercentiles};
use crate::types::{harmonic_orders, CurrentLimitRow, HarmonicSubject, Verdict, PHASES};

pub const VOLTAGE_THD_CATEGORY: &str = "Voltage THD";
pub const VOLTAGE_HARMONICS_CATEGORY: &str = "Individual Voltage Harmonics";
pub const CURRENT_TDD_CATEGORY: &str = "Current TDD";
pub const CURRENT_THD_CATEGORY: &str = "Current THD";
pub const CURRENT_HARMONICS_CATEGORY: &str = "Individual Current Harmonics";

pub const TDD_RULE: &str = "Overall TDD > limit";

/// Description of an individual-harmonic violation; one failing point per order
pub fn harmonic_rule(order: u8) -> String {
    format!("Harmonic {} > limit", order)
}

/// Instant voltage THD may reach this multiple of the THD limit
const VOLTAGE_SPIKE_FACTOR: f64 = 1.5;
/// Instant current THD may reach this multiple of the TDD limit
const CURRENT_SPIKE_FACTOR: f64 = 2.0;
/// Window p99 current THD may reach this multiple of the TDD limit
const CURRENT_UPPER_WINDOW_FACTOR: f64 = 1.5;

/// Everything the evaluator reads
#[derive(Debug, Clone, Copy)]
pub struct ComplianceInputs<'a> {
    pub limits: &'a ResolvedLimits,
    pub voltage_thd: &'a ThdPercentiles,
    pub current_thd: &'a ThdPercentiles,
    pub voltage_harmonics: &'a HarmonicPercentiles,
    pub current_harmonics: &'a HarmonicPercentiles,
    /// Total demand distortion (%)
    pub tdd: f64,
    /// Sustained window length, used in rule descriptions
    pub window_minutes: u32,
}

/// Verdicts plus the grouped violations behind them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceOutcome {
    pub voltage: Verdict,
    pub current: Verdict,
    pub failing_points: FailingPoints,
}

impl ComplianceOutcome {
    fn fail(&mut self, subject: HarmonicSubject, category: &str, description: &str) -> FailRecord<'_> {
        match subject {
            HarmonicSubject::Voltage => self.voltage.fail(),
            HarmonicSubject::Current => self.current.fail(),
        }
        FailRecord {
            points: &mut self.failing_points,
            category: category.to_string(),
            description: description.to_string(),
        }
    }
}

/// Pending failing point, committed with the triggering phase and/or order
struct FailRecord<'a> {
    points: &'a mut FailingPoints,
    category: String,
    description: String,
}

impl FailRecord<'_> {
    fn at(self, phase: Option<&str>, harmonic: Option<u8>) {
        self.points
            .record(&self.category, &self.description, phase, harmonic);
    }
}

/// Run every rule and collect the outcome
pub fn evaluate(inputs: &ComplianceInputs<'_>) -> ComplianceOutcome {
    let mut outcome = ComplianceOutcome::default();

    check_voltage_thd(inputs, &mut outcome);
    check_individual_harmonics(
        HarmonicSubject::Voltage,
        inputs.voltage_harmonics,
        |_| inputs.limits.voltage.individual_limit,
        &mut outcome,
    );

    match inputs.limits.current {
        Some(row) => {
            check_tdd(inputs.tdd, row, &mut outcome);
            check_current_thd(inputs, row, &mut outcome);
            check_individual_harmonics(
                HarmonicSubject::Current,
                inputs.current_harmonics,
                |order| row.limit_for_order(order),
                &mut outcome,
            );
        }
        None => debug!("No current limit row applies, current rules skipped"),
    }

    info!(
        voltage = %outcome.voltage,
        current = %outcome.current,
        failing_groups = outcome.failing_points.len(),
        "Compliance evaluated"
    );
    outcome
}

// ============================================================================
// Rules
// ============================================================================

fn window_label(window_minutes: u32) -> String {
    format!("({}min)", window_minutes)
}

fn check_voltage_thd(inputs: &ComplianceInputs<'_>, outcome: &mut ComplianceOutcome) {
    let thd_limit = inputs.limits.voltage.thd_limit;
    let spike_rule = "99th Percentile (3s) > 1.5x limit";
    let sustained_rule = format!(
        "95th Percentile {} > limit",
        window_label(inputs.window_minutes)
    );

    for phase in PHASES {
        let set = inputs.voltage_thd.phase(phase);
        let label = HarmonicSubject::Voltage.thd_phase_label(phase);

        if set.p99_instant > thd_limit * VOLTAGE_SPIKE_FACTOR {
            outcome
                .fail(HarmonicSubject::Voltage, VOLTAGE_THD_CATEGORY, spike_rule)
                .at(Some(&label), None);
        }
        if set.p95_window > thd_limit {
            outcome
                .fail(HarmonicSubject::Voltage, VOLTAGE_THD_CATEGORY, &sustained_rule)
                .at(Some(&label), None);
        }
    }
}

fn check_tdd(tdd: f64, row: &CurrentLimitRow, outcome: &mut ComplianceOutcome) {
    if tdd > row.tdd_limit {
        outcome
            .fail(HarmonicSubject::Current, CURRENT_TDD_CATEGORY, TDD_RULE)
            .at(None, None);
    }
}

fn check_current_thd(
    inputs: &ComplianceInputs<'_>,
    row: &CurrentLimitRow,
    outcome: &mut ComplianceOutcome,
) {
    let tdd_limit = row.tdd_limit;
    let window = window_label(inputs.window_minutes);
    let spike_rule = "99th Percentile (3s) > 2x TDD limit".to_string();
    let sustained_rule = format!("95th Percentile {} > TDD limit", window);
    let upper_rule = format!("99th Percentile {} > 1.5x TDD limit", window);

    for phase in PHASES {
        let set = inputs.current_thd.phase(phase);
        let label = HarmonicSubject::Current.thd_phase_label(phase);

        let tiers = [
            (set.p99_instant, tdd_limit * CURRENT_SPIKE_FACTOR, &spike_rule),
            (set.p95_window, tdd_limit, &sustained_rule),
            (set.p99_window, tdd_limit * CURRENT_UPPER_WINDOW_FACTOR, &upper_rule),
        ];
        for (value, threshold, rule) in tiers {
            if value > threshold {
                outcome
                    .fail(HarmonicSubject::Current, CURRENT_THD_CATEGORY, rule)
                    .at(Some(&label), None);
            }
        }
    }
}

fn check_individual_harmonics(
    subject: HarmonicSubject,
    percentiles: &HarmonicPercentiles,
    limit_for_order: impl Fn(u8) -> f64,
    outcome: &mut ComplianceOutcome,
) {
    let category = match subject {
        HarmonicSubject::Voltage => VOLTAGE_HARMONICS_CATEGORY,
        HarmonicSubject::Current => CURRENT_HARMONICS_CATEGORY,
    };

    for order in harmonic_orders() {
        let limit = limit_for_order(order);
        let rule = harmonic_rule(order);
        for phase in PHASES {
            // Combinations absent from the worksheet are skipped, not treated as zero
            let Some(value) = percentiles.get(phase, order) else {
                continue;
            };
            if value > limit {
                let label = subject.harmonic_phase_label(phase);
                outcome
                    .fail(subject, category, &rule)
                    .at(Some(&label), Some(order));
            }
        }
    }
}
