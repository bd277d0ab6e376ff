//! Indicator configuration and the errors compute functions raise.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("expected {expected} input series, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("missing configuration value '{0}'")]
    MissingConfig(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Numeric settings an indicator may declare. Unset fields are not used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl IndicatorConfig {
    pub const EMPTY: IndicatorConfig = IndicatorConfig {
        period: None,
        slow_period: None,
        smoothing: None,
        multiplier: None,
        start: None,
        step: None,
        max: None,
    };

    pub const fn with_period(period: usize) -> Self {
        IndicatorConfig {
            period: Some(period),
            ..Self::EMPTY
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Compact `key=value` listing of the set fields.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                parts.push(format!("{key}={v}"));
            }
        };
        push("period", self.period.map(|v| v.to_string()));
        push("slow_period", self.slow_period.map(|v| v.to_string()));
        push("smoothing", self.smoothing.map(|v| v.to_string()));
        push("multiplier", self.multiplier.map(|v| v.to_string()));
        push("start", self.start.map(|v| v.to_string()));
        push("step", self.step.map(|v| v.to_string()));
        push("max", self.max.map(|v| v.to_string()));
        parts.join(", ")
    }
}

/// Bind the positional inputs of a compute call to a fixed-size array.
pub(crate) fn inputs<'a, const N: usize>(
    series: &[&'a [f64]],
) -> Result<[&'a [f64]; N], IndicatorError> {
    <[&'a [f64]; N]>::try_from(series).map_err(|_| IndicatorError::ArityMismatch {
        expected: N,
        actual: series.len(),
    })
}

/// A window length that must be configured and at least 1.
pub(crate) fn window(
    config: Option<&IndicatorConfig>,
    name: &'static str,
    get: fn(&IndicatorConfig) -> Option<usize>,
) -> Result<usize, IndicatorError> {
    let value = config.and_then(get).ok_or(IndicatorError::MissingConfig(name))?;
    if value == 0 {
        return Err(IndicatorError::InvalidParameter {
            name,
            reason: "must be at least 1".into(),
        });
    }
    Ok(value)
}

/// A factor that must be configured, finite and positive.
pub(crate) fn factor(
    config: Option<&IndicatorConfig>,
    name: &'static str,
    get: fn(&IndicatorConfig) -> Option<f64>,
) -> Result<f64, IndicatorError> {
    let value = config.and_then(get).ok_or(IndicatorError::MissingConfig(name))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(IndicatorError::InvalidParameter {
            name,
            reason: format!("{value} is not a positive number"),
        });
    }
    Ok(value)
}

pub(crate) fn period(config: Option<&IndicatorConfig>) -> Result<usize, IndicatorError> {
    window(config, "period", |c| c.period)
}
