//! IEEE 519-2022 harmonic limit tables
//!
//! Both tables are immutable statics. Selection logic lives in [`crate::limits`].

use serde::Serialize;

// ============================================================================
// Voltage distortion limits (IEEE 519-2022 Table 1)
// ============================================================================

/// Nominal bus voltage class at the PCC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoltageBand {
    /// V ≤ 1 kV
    UpTo1kV,
    /// 1 kV < V ≤ 69 kV
    From1To69kV,
    /// 69 kV < V ≤ 161 kV
    From69To161kV,
    /// V > 161 kV
    Above161kV,
}

impl std::fmt::Display for VoltageBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoltageBand::UpTo1kV => write!(f, "V <= 1 kV"),
            VoltageBand::From1To69kV => write!(f, "1 kV < V <= 69 kV"),
            VoltageBand::From69To161kV => write!(f, "69 kV < V <= 161 kV"),
            VoltageBand::Above161kV => write!(f, "V > 161 kV"),
        }
    }
}

/// One row of the voltage limit table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoltageLimitRow {
    pub band: VoltageBand,
    /// Inclusive upper bound of the band in volts; `None` for the open top band
    #[serde(skip)]
    pub upper_bound_volts: Option<f64>,
    /// Individual harmonic limit (% of fundamental)
    pub individual_limit: f64,
    /// THD limit (%)
    pub thd_limit: f64,
}

/// Voltage limit rows, ascending by band
pub static VOLTAGE_LIMITS: [VoltageLimitRow; 4] = [
    VoltageLimitRow {
        band: VoltageBand::UpTo1kV,
        upper_bound_volts: Some(1_000.0),
        individual_limit: 5.0,
        thd_limit: 8.0,
    },
    VoltageLimitRow {
        band: VoltageBand::From1To69kV,
        upper_bound_volts: Some(69_000.0),
        individual_limit: 3.0,
        thd_limit: 5.0,
    },
    VoltageLimitRow {
        band: VoltageBand::From69To161kV,
        upper_bound_volts: Some(161_000.0),
        individual_limit: 1.5,
        thd_limit: 2.5,
    },
    VoltageLimitRow {
        band: VoltageBand::Above161kV,
        upper_bound_volts: None,
        individual_limit: 1.0,
        thd_limit: 1.5,
    },
];

// ============================================================================
// Current distortion limits (IEEE 519-2022 Table 2, 120 V – 69 kV)
// ============================================================================

/// The current table only applies up to this nominal voltage (volts)
pub const CURRENT_LIMITS_MAX_NOMINAL_VOLTAGE: f64 = 69_000.0;

/// Harmonic order classes of the current limit table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderClass {
    /// h < 11
    Below11,
    /// 11 ≤ h < 17
    From11To17,
    /// 17 ≤ h < 23
    From17To23,
    /// 23 ≤ h < 35
    From23To35,
    /// h ≥ 35
    From35,
}

impl OrderClass {
    pub fn of(order: u8) -> Self {
        match order {
            0..=10 => OrderClass::Below11,
            11..=16 => OrderClass::From11To17,
            17..=22 => OrderClass::From17To23,
            23..=34 => OrderClass::From23To35,
            _ => OrderClass::From35,
        }
    }

    fn index(self) -> usize {
        match self {
            OrderClass::Below11 => 0,
            OrderClass::From11To17 => 1,
            OrderClass::From17To23 => 2,
            OrderClass::From23To35 => 3,
            OrderClass::From35 => 4,
        }
    }
}

/// One Isc/Il band of the current limit table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentLimitRow {
    /// Inclusive lower ratio bound
    pub ratio_low: f64,
    /// Exclusive upper ratio bound; `None` for the open top band
    pub ratio_high: Option<f64>,
    /// Individual harmonic limits (% of Il) indexed by [`OrderClass`]
    pub per_order_limits: [f64; 5],
    /// TDD limit (%)
    pub tdd_limit: f64,
}

impl CurrentLimitRow {
    /// Closed-low / open-high band membership
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.ratio_low && self.ratio_high.map_or(true, |high| ratio < high)
    }

    /// Individual harmonic limit for an order
    pub fn limit_for_order(&self, order: u8) -> f64 {
        self.per_order_limits[OrderClass::of(order).index()]
    }
}

/// Current limit rows, ascending by Isc/Il band
pub static CURRENT_LIMITS: [CurrentLimitRow; 5] = [
    CurrentLimitRow {
        ratio_low: 0.0,
        ratio_high: Some(20.0),
        per_order_limits: [4.0, 2.0, 1.5, 0.6, 0.3],
        tdd_limit: 5.0,
    },
    CurrentLimitRow {
        ratio_low: 20.0,
        ratio_high: Some(50.0),
        per_order_limits: [7.0, 3.5, 2.5, 1.0, 0.5],
        tdd_limit: 8.0,
    },
    CurrentLimitRow {
        ratio_low: 50.0,
        ratio_high: Some(100.0),
        per_order_limits: [10.0, 4.5, 4.0, 1.5, 0.7],
        tdd_limit: 12.0,
    },
    CurrentLimitRow {
        ratio_low: 100.0,
        ratio_high: Some(1_000.0),
        per_order_limits: [12.0, 5.5, 5.0, 2.0, 1.0],
        tdd_limit: 15.0,
    },
    CurrentLimitRow {
        ratio_low: 1_000.0,
        ratio_high: None,
        per_order_limits: [15.0, 7.0, 6.0, 2.5, 1.4],
        tdd_limit: 20.0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_classes() {
        assert_eq!(OrderClass::of(2), OrderClass::Below11);
        assert_eq!(OrderClass::of(10), OrderClass::Below11);
        assert_eq!(OrderClass::of(11), OrderClass::From11To17);
        assert_eq!(OrderClass::of(16), OrderClass::From11To17);
        assert_eq!(OrderClass::of(17), OrderClass::From17To23);
        assert_eq!(OrderClass::of(23), OrderClass::From23To35);
        assert_eq!(OrderClass::of(34), OrderClass::From23To35);
        assert_eq!(OrderClass::of(35), OrderClass::From35);
        assert_eq!(OrderClass::of(50), OrderClass::From35);
    }

    #[test]
    fn test_limit_for_order_uses_row_values() {
        let row = &CURRENT_LIMITS[2];
        assert_eq!(row.limit_for_order(5), 10.0);
        assert_eq!(row.limit_for_order(13), 4.5);
        assert_eq!(row.limit_for_order(19), 4.0);
        assert_eq!(row.limit_for_order(25), 1.5);
        assert_eq!(row.limit_for_order(49), 0.7);
    }

    #[test]
    fn test_current_bands_are_contiguous() {
        for pair in CURRENT_LIMITS.windows(2) {
            assert_eq!(pair[0].ratio_high, Some(pair[1].ratio_low));
        }
        assert!(CURRENT_LIMITS[4].ratio_high.is_none());
    }

    #[test]
    fn test_voltage_limits_tighten_with_voltage() {
        for pair in VOLTAGE_LIMITS.windows(2) {
            assert!(pair[1].thd_limit < pair[0].thd_limit);
            assert!(pair[1].individual_limit < pair[0].individual_limit);
        }
    }
}
