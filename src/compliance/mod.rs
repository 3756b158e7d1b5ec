//! Compliance evaluation against the resolved IEEE 519 limits
//!
//! - `evaluator`: the rule set and the two monotone verdicts
//! - `failing_points`: grouped violation accumulator

pub mod evaluator;
pub mod failing_points;

pub use evaluator::{evaluate, ComplianceInputs, ComplianceOutcome};
pub use failing_points::{FailingPoint, FailingPoints};
