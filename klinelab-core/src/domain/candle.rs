//! Candle — one OHLCV row, extensible with indicator columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A price/volume column an indicator can consume.
///
/// `Any` is used by indicators that work on an arbitrary series; it always
/// resolves to the close column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRole {
    Open,
    High,
    Low,
    Close,
    Volume,
    Any,
}

impl InputRole {
    pub fn as_str(self) -> &'static str {
        match self {
            InputRole::Open => "open",
            InputRole::High => "high",
            InputRole::Low => "low",
            InputRole::Close => "close",
            InputRole::Volume => "volume",
            InputRole::Any => "any",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV candle for a single interval bucket.
///
/// `timestamp` is the bucket open time in epoch milliseconds. Indicator
/// columns live in `values`; `None` is the explicit null marker for a value
/// that is undefined (warm-up) or non-finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Option<f64>>,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            values: BTreeMap::new(),
        }
    }

    /// Value of the price/volume column named by `role`.
    pub fn field(&self, role: InputRole) -> f64 {
        match role {
            InputRole::Open => self.open,
            InputRole::High => self.high,
            InputRole::Low => self.low,
            InputRole::Close | InputRole::Any => self.close,
            InputRole::Volume => self.volume,
        }
    }

    /// Indicator value by column name. `None` if the column is missing or null.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    /// True if any attribute of the row is null (or a non-finite OHLCV field).
    pub fn has_null(&self) -> bool {
        let ohlcv_invalid = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .any(|v| !v.is_finite());
        ohlcv_invalid || self.values.values().any(Option::is_none)
    }
}
