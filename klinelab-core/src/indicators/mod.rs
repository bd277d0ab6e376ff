//! Technical indicators.
//!
//! The math lives in plain slice functions grouped by category (`trend`,
//! `momentum`, `volatility`, `volume`). Each returns a series as long as its
//! input, with `NaN` for rows where the value is undefined. The registry
//! describes every indicator once and the engine writes their results into a
//! dataset as columns.

pub mod engine;
pub mod momentum;
pub mod output;
pub mod params;
pub mod registry;
pub mod smoothing;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use engine::{store_value, EnrichError, EnrichWarning, Enriched, IndicatorEngine, PruneMode};
pub use output::IndicatorOutput;
pub use params::{IndicatorConfig, IndicatorError};
pub use registry::{ComputeFn, IndicatorCategory, IndicatorDescriptor, IndicatorRegistry, RegistryError};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
