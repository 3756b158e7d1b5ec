//! Statistical aggregation of trend and harmonic series

pub mod percentiles;

pub use percentiles::{
    last, max, mean, percentile, resample_percentile, HarmonicPercentiles, PercentileSet,
    ThdPercentiles,
};
