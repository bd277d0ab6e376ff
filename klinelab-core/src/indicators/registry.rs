//! Indicator catalog.
//!
//! Every indicator is described once: its key, the input columns it reads
//! (in call order), its default configuration and a plain function pointer
//! that does the math. The built-in catalog is built on first use and never
//! changes afterwards; callers needing other defaults build their own
//! registry from descriptors.

use super::output::IndicatorOutput;
use super::params::{IndicatorConfig, IndicatorError};
use super::{momentum, trend, volatility, volume};
use crate::domain::InputRole;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Organizational grouping. Has no effect on computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorCategory {
    Trend,
    Momentum,
    Volatility,
    Volume,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 4] = [
        IndicatorCategory::Trend,
        IndicatorCategory::Momentum,
        IndicatorCategory::Volatility,
        IndicatorCategory::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorCategory::Trend => "Trend",
            IndicatorCategory::Momentum => "Momentum",
            IndicatorCategory::Volatility => "Volatility",
            IndicatorCategory::Volume => "Volume",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional series in descriptor input order, plus the configuration when
/// the descriptor declares one.
pub type ComputeFn =
    fn(&[&[f64]], Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError>;

#[derive(Clone)]
pub struct IndicatorDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub category: IndicatorCategory,
    pub inputs: &'static [InputRole],
    pub config: IndicatorConfig,
    pub compute: ComputeFn,
}

impl IndicatorDescriptor {
    pub fn new(
        name: &'static str,
        title: &'static str,
        category: IndicatorCategory,
        inputs: &'static [InputRole],
        config: IndicatorConfig,
        compute: ComputeFn,
    ) -> Self {
        Self {
            name,
            title,
            category,
            inputs,
            config,
            compute,
        }
    }

    /// Configuration passed to `compute`: `None` when nothing is declared.
    pub fn call_config(&self) -> Option<&IndicatorConfig> {
        (!self.config.is_empty()).then_some(&self.config)
    }

    pub fn invoke(&self, series: &[&[f64]]) -> Result<IndicatorOutput, IndicatorError> {
        (self.compute)(series, self.call_config())
    }
}

impl fmt::Debug for IndicatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("indicator '{0}' is registered twice")]
    DuplicateName(String),

    #[error("no indicator named '{0}'")]
    UnknownName(String),
}

#[derive(Debug, Clone)]
pub struct IndicatorRegistry {
    descriptors: Vec<IndicatorDescriptor>,
}

static BUILTIN: OnceLock<IndicatorRegistry> = OnceLock::new();

impl IndicatorRegistry {
    /// The built-in catalog.
    pub fn builtin() -> &'static IndicatorRegistry {
        BUILTIN.get_or_init(|| {
            let descriptors = trend::descriptors()
                .into_iter()
                .chain(momentum::descriptors())
                .chain(volatility::descriptors())
                .chain(volume::descriptors())
                .collect();
            IndicatorRegistry { descriptors }
        })
    }

    /// Build a registry from descriptors. Names must be unique, ignoring
    /// ASCII case.
    pub fn from_descriptors(descriptors: Vec<IndicatorDescriptor>) -> Result<Self, RegistryError> {
        for (i, d) in descriptors.iter().enumerate() {
            if descriptors[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(d.name))
            {
                return Err(RegistryError::DuplicateName(d.name.to_string()));
            }
        }
        Ok(Self { descriptors })
    }

    /// Replace the default configuration of one indicator.
    pub fn with_config(mut self, name: &str, config: IndicatorConfig) -> Result<Self, RegistryError> {
        let idx = self
            .position(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))?;
        self.descriptors[idx].config = config;
        Ok(self)
    }

    /// Exact match on the canonical name first, then ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Option<&IndicatorDescriptor> {
        self.position(name).map(|i| &self.descriptors[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.descriptors
            .iter()
            .position(|d| d.name == name)
            .or_else(|| {
                self.descriptors
                    .iter()
                    .position(|d| d.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorDescriptor> {
        self.descriptors.iter()
    }

    pub fn in_category(&self, category: IndicatorCategory) -> impl Iterator<Item = &IndicatorDescriptor> {
        self.descriptors.iter().filter(move |d| d.category == category)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
