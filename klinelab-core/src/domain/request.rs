//! Fetch request — what to download, and how large each page may be.

use crate::data::DataError;
use crate::interval::Interval;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest page size accepted by the fetcher.
pub const MIN_LIMIT: u32 = 100;
/// Exchange maximum page size for the kline endpoint.
pub const MAX_LIMIT: u32 = 1000;
/// Default page size.
pub const DEFAULT_LIMIT: u32 = 200;

/// Market category of the kline endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Linear,
    Inverse,
    Spot,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Linear => "linear",
            Category::Inverse => "inverse",
            Category::Spot => "spot",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Category::Linear),
            "inverse" => Ok(Category::Inverse),
            "spot" => Ok(Category::Spot),
            other => Err(DataError::InvalidRequest(format!(
                "unknown category '{other}' (expected linear, inverse or spot)"
            ))),
        }
    }
}

/// A request for a historical candle series.
///
/// `start` is inclusive, in epoch milliseconds. `end` defaults to the time
/// the fetch starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub category: Category,
    pub symbol: String,
    pub interval: Interval,
    pub limit: u32,
    pub start: i64,
    pub end: Option<i64>,
}

impl FetchRequest {
    pub fn new(category: Category, symbol: impl Into<String>, interval: Interval, start: i64) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            interval,
            limit: DEFAULT_LIMIT,
            start,
            end: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_end(mut self, end: i64) -> Self {
        self.end = Some(end);
        self
    }

    /// Check the request-level invariants that do not depend on the clock.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbol.trim().is_empty() {
            return Err(DataError::InvalidRequest("symbol must not be empty".into()));
        }
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&self.limit) {
            return Err(DataError::InvalidRequest(format!(
                "limit {} outside {MIN_LIMIT}..={MAX_LIMIT}",
                self.limit
            )));
        }
        if self.start < 0 {
            return Err(DataError::InvalidRequest(format!(
                "start {} is before the epoch",
                self.start
            )));
        }
        Ok(())
    }
}

/// Parse a timestamp given as epoch milliseconds, RFC 3339, or `YYYY-MM-DD`
/// (midnight UTC). Returns `None` for anything else.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Format epoch milliseconds as a UTC calendar date.
pub fn format_date(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ms.to_string())
}
