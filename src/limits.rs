//! Limit table resolution
//!
//! Picks the voltage limit row for the nominal PCC voltage and the current limit
//! row for the short-circuit ratio Isc/Il. Above 69 kV the current table does not
//! apply and no current row is returned; current compliance is then reported as
//! passing rather than "not applicable".

use serde::Serialize;
use tracing::debug;

use crate::types::{
    CurrentLimitRow, VoltageLimitRow, CURRENT_LIMITS, CURRENT_LIMITS_MAX_NOMINAL_VOLTAGE,
    VOLTAGE_LIMITS,
};

/// Limits selected for one analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedLimits {
    pub voltage: &'static VoltageLimitRow,
    /// `None` when the current table does not apply
    pub current: Option<&'static CurrentLimitRow>,
    /// Isc / Il used for the current band
    pub short_circuit_ratio: f64,
}

impl ResolvedLimits {
    pub fn resolve(nominal_voltage: f64, isc: f64, il: f64) -> Self {
        let voltage = voltage_limits(nominal_voltage);
        let short_circuit_ratio = short_circuit_ratio(isc, il);
        let current = current_limits(nominal_voltage, short_circuit_ratio);

        debug!(
            nominal_voltage,
            band = %voltage.band,
            ratio = short_circuit_ratio,
            tdd_limit = current.map(|row| row.tdd_limit),
            "Resolved IEEE 519 limits"
        );

        Self {
            voltage,
            current,
            short_circuit_ratio,
        }
    }
}

/// Voltage row whose band contains the nominal voltage (volts).
///
/// Bands are upper-inclusive; anything above 161 kV, or not comparable at all,
/// falls to the top row.
pub fn voltage_limits(nominal_voltage: f64) -> &'static VoltageLimitRow {
    VOLTAGE_LIMITS
        .iter()
        .find(|row| {
            row.upper_bound_volts
                .map_or(false, |upper| nominal_voltage <= upper)
        })
        .unwrap_or(&VOLTAGE_LIMITS[VOLTAGE_LIMITS.len() - 1])
}

/// Isc / Il, or 0 when Il is not positive
pub fn short_circuit_ratio(isc: f64, il: f64) -> f64 {
    if il > 0.0 {
        isc / il
    } else {
        0.0
    }
}

/// Current row for the ratio, `None` above 69 kV or when no band contains the ratio
pub fn current_limits(nominal_voltage: f64, ratio: f64) -> Option<&'static CurrentLimitRow> {
    if !(nominal_voltage <= CURRENT_LIMITS_MAX_NOMINAL_VOLTAGE) {
        return None;
    }
    CURRENT_LIMITS.iter().find(|row| row.contains(ratio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoltageBand;

    #[test]
    fn test_voltage_bands() {
        assert_eq!(voltage_limits(0.0).band, VoltageBand::UpTo1kV);
        assert_eq!(voltage_limits(400.0).band, VoltageBand::UpTo1kV);
        assert_eq!(voltage_limits(1_000.0).band, VoltageBand::UpTo1kV);
        assert_eq!(voltage_limits(1_000.1).band, VoltageBand::From1To69kV);
        assert_eq!(voltage_limits(22_000.0).band, VoltageBand::From1To69kV);
        assert_eq!(voltage_limits(69_000.0).band, VoltageBand::From1To69kV);
        assert_eq!(voltage_limits(115_000.0).band, VoltageBand::From69To161kV);
        assert_eq!(voltage_limits(161_000.0).band, VoltageBand::From69To161kV);
        assert_eq!(voltage_limits(230_000.0).band, VoltageBand::Above161kV);
        assert_eq!(voltage_limits(1e12).band, VoltageBand::Above161kV);
    }

    #[test]
    fn test_every_voltage_maps_to_exactly_one_band() {
        let mut v = 0.0;
        while v < 300_000.0 {
            let matching = VOLTAGE_LIMITS
                .iter()
                .enumerate()
                .filter(|(i, row)| {
                    let lower = if *i == 0 {
                        f64::NEG_INFINITY
                    } else {
                        VOLTAGE_LIMITS[i - 1].upper_bound_volts.unwrap_or(f64::INFINITY)
                    };
                    v > lower && row.upper_bound_volts.map_or(true, |u| v <= u)
                })
                .count();
            assert_eq!(matching, 1, "voltage {} matched {} bands", v, matching);
            assert!(std::ptr::eq(
                voltage_limits(v),
                VOLTAGE_LIMITS
                    .iter()
                    .find(|row| row.upper_bound_volts.map_or(true, |u| v <= u))
                    .unwrap()
            ));
            v += 250.0;
        }
    }

    #[test]
    fn test_ratio_guard() {
        assert_eq!(short_circuit_ratio(1_000.0, 50.0), 20.0);
        assert_eq!(short_circuit_ratio(1_000.0, 0.0), 0.0);
        assert_eq!(short_circuit_ratio(1_000.0, -5.0), 0.0);
    }

    #[test]
    fn test_ratio_boundaries_map_to_higher_band() {
        assert_eq!(current_limits(400.0, 0.0).unwrap().tdd_limit, 5.0);
        assert_eq!(current_limits(400.0, 19.999).unwrap().tdd_limit, 5.0);
        assert_eq!(current_limits(400.0, 20.0).unwrap().tdd_limit, 8.0);
        assert_eq!(current_limits(400.0, 50.0).unwrap().tdd_limit, 12.0);
        assert_eq!(current_limits(400.0, 100.0).unwrap().tdd_limit, 15.0);
        assert_eq!(current_limits(400.0, 1_000.0).unwrap().tdd_limit, 20.0);
        assert_eq!(current_limits(400.0, 1e9).unwrap().tdd_limit, 20.0);
    }

    #[test]
    fn test_current_table_not_applicable_above_69kv() {
        assert!(current_limits(69_000.0, 30.0).is_some());
        assert!(current_limits(69_001.0, 30.0).is_none());
        assert!(current_limits(230_000.0, 30.0).is_none());
    }

    #[test]
    fn test_negative_ratio_has_no_band() {
        assert!(current_limits(400.0, -1.0).is_none());
    }

    #[test]
    fn test_resolve_combines_rows() {
        let limits = ResolvedLimits::resolve(400.0, 1_000.0, 50.0);
        assert_eq!(limits.voltage.thd_limit, 8.0);
        assert_eq!(limits.short_circuit_ratio, 20.0);
        assert_eq!(limits.current.unwrap().tdd_limit, 8.0);
    }
}
