//! Derived electrical quantities: total demand distortion and power factor

use crate::statistics::mean;

/// Calculate total demand distortion (TDD, %)
///
/// The harmonic RMS current is recovered from THDi and the average RMS current,
/// then normalized to the maximum demand load current Il:
///
/// ```text
/// t   = THDi / 100
/// Ih  = I_avg * t / sqrt(1 + t²)
/// TDD = Ih / Il * 100
/// ```
///
/// ## Input
/// - `thdi_percent`: current THD, sustained-window 95th percentile (%)
/// - `avg_current`: average RMS current over the record (A)
/// - `max_demand_current`: Il at the PCC (A)
///
/// ## Returns
/// TDD in percent. Returns 0.0 if any input is not positive.
pub fn total_demand_distortion(thdi_percent: f64, avg_current: f64, max_demand_current: f64) -> f64 {
    if !(thdi_percent > 0.0 && avg_current > 0.0 && max_demand_current > 0.0) {
        return 0.0;
    }
    let thdi = thdi_percent / 100.0;
    let harmonic_current = avg_current * thdi / (1.0 + thdi * thdi).sqrt();
    harmonic_current / max_demand_current * 100.0
}

/// Average true power factor W/VA over samples with non-zero apparent power.
///
/// Returns `None` when no sample has apparent power, i.e. the power factor was
/// not measurable.
pub fn average_power_factor(active_power: &[f64], apparent_power: &[f64]) -> Option<f64> {
    let ratios: Vec<f64> = active_power
        .iter()
        .zip(apparent_power)
        .filter(|(_, va)| **va != 0.0)
        .map(|(w, va)| w / va)
        .filter(|pf| pf.is_finite())
        .collect();
    if ratios.is_empty() {
        None
    } else {
        Some(mean(&ratios))
    }
}
