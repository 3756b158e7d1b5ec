//! Advisory text for a finished analysis
//!
//! Independent rules, each appended when its trigger holds. When none fire the
//! list holds the single healthy-system message.

use crate::types::Verdict;

pub const VOLTAGE_ADVICE: &str =
    "Investigate voltage sources for harmonic distortion. Consider passive or active harmonic filters.";
pub const CURRENT_ADVICE: &str =
    "Identify non-linear loads causing current distortion. Consider installing harmonic filters.";
pub const POWER_FACTOR_ADVICE: &str =
    "Improve power factor by installing capacitor banks or using active power factor correction (PFC).";
pub const HEALTHY_MESSAGE: &str =
    "System power quality appears to be in good condition. Continuous monitoring is recommended.";

/// Default power factor below which correction is advised
pub const DEFAULT_POWER_FACTOR_TARGET: f64 = 0.95;

/// Inputs of the recommendation rules
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs {
    pub voltage: Verdict,
    pub current: Verdict,
    /// `None` when the power factor could not be measured
    pub power_factor: Option<f64>,
    pub power_factor_target: f64,
}

pub fn generate_recommendations(inputs: &RecommendationInputs) -> Vec<String> {
    let mut out = Vec::new();

    if inputs.voltage.is_fail() {
        out.push(VOLTAGE_ADVICE.to_string());
    }
    if inputs.current.is_fail() {
        out.push(CURRENT_ADVICE.to_string());
    }
    if inputs
        .power_factor
        .is_some_and(|pf| pf < inputs.power_factor_target)
    {
        out.push(POWER_FACTOR_ADVICE.to_string());
    }

    if out.is_empty() {
        out.push(HEALTHY_MESSAGE.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(voltage: Verdict, current: Verdict, power_factor: Option<f64>) -> RecommendationInputs {
        RecommendationInputs {
            voltage,
            current,
            power_factor,
            power_factor_target: DEFAULT_POWER_FACTOR_TARGET,
        }
    }

    #[test]
    fn test_healthy_system_gets_single_message() {
        let recs = generate_recommendations(&inputs(Verdict::Pass, Verdict::Pass, Some(0.99)));
        assert_eq!(recs, vec![HEALTHY_MESSAGE.to_string()]);
    }

    #[test]
    fn test_rules_are_not_mutually_exclusive() {
        let recs = generate_recommendations(&inputs(Verdict::Fail, Verdict::Fail, Some(0.80)));
        assert_eq!(recs, vec![VOLTAGE_ADVICE, CURRENT_ADVICE, POWER_FACTOR_ADVICE]);
    }

    #[test]
    fn test_unmeasured_power_factor_does_not_trigger_correction() {
        let recs = generate_recommendations(&inputs(Verdict::Pass, Verdict::Pass, None));
        assert_eq!(recs, vec![HEALTHY_MESSAGE]);
    }

    #[test]
    fn test_power_factor_at_target_is_fine() {
        let recs = generate_recommendations(&inputs(Verdict::Pass, Verdict::Fail, Some(0.95)));
        assert_eq!(recs, vec![CURRENT_ADVICE]);
    }
}
