//! Interval calendar — maps candle interval labels to window durations.
//!
//! Labels follow the exchange's kline interval codes: minute counts
//! ("1" … "720"), plus "D", "W" and "M". Display titles ("15m", "1D", …)
//! are accepted as aliases.
//!
//! Month windows use a fixed 30-day approximation. They only size fetch
//! windows, they are never used to compute candle timestamps.

use crate::data::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MINUTE_MS: i64 = 60_000;
pub const DAY_MS: i64 = 86_400_000;

/// Kline interval supported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H12,
    D1,
    W1,
    Month1,
}

impl Interval {
    /// All intervals, shortest first.
    pub const ALL: [Interval; 13] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::H6,
        Interval::H12,
        Interval::D1,
        Interval::W1,
        Interval::Month1,
    ];

    /// Parse an interval label. Unknown labels are a hard error.
    pub fn parse(label: &str) -> Result<Self, DataError> {
        let label = label.trim();
        let found = Self::ALL
            .iter()
            .copied()
            .find(|iv| iv.api_code() == label || iv.title() == label);
        found.ok_or_else(|| DataError::UnsupportedInterval(label.to_string()))
    }

    /// Interval code sent to the kline endpoint.
    pub fn api_code(self) -> &'static str {
        match self {
            Interval::M1 => "1",
            Interval::M3 => "3",
            Interval::M5 => "5",
            Interval::M15 => "15",
            Interval::M30 => "30",
            Interval::H1 => "60",
            Interval::H2 => "120",
            Interval::H4 => "240",
            Interval::H6 => "360",
            Interval::H12 => "720",
            Interval::D1 => "D",
            Interval::W1 => "W",
            Interval::Month1 => "M",
        }
    }

    /// Human-readable title ("15m", "1D", …).
    pub fn title(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "60m",
            Interval::H2 => "120m",
            Interval::H4 => "240m",
            Interval::H6 => "360m",
            Interval::H12 => "720m",
            Interval::D1 => "1D",
            Interval::W1 => "1W",
            Interval::Month1 => "1M",
        }
    }

    /// Duration of a single candle in milliseconds.
    pub fn millis(self) -> i64 {
        match self {
            Interval::M1 => MINUTE_MS,
            Interval::M3 => 3 * MINUTE_MS,
            Interval::M5 => 5 * MINUTE_MS,
            Interval::M15 => 15 * MINUTE_MS,
            Interval::M30 => 30 * MINUTE_MS,
            Interval::H1 => 60 * MINUTE_MS,
            Interval::H2 => 120 * MINUTE_MS,
            Interval::H4 => 240 * MINUTE_MS,
            Interval::H6 => 360 * MINUTE_MS,
            Interval::H12 => 720 * MINUTE_MS,
            Interval::D1 => DAY_MS,
            Interval::W1 => 7 * DAY_MS,
            Interval::Month1 => 30 * DAY_MS,
        }
    }

    /// Duration of `count` consecutive candles in milliseconds.
    pub fn window_millis(self, count: u32) -> i64 {
        self.millis().saturating_mul(i64::from(count))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::parse(s)
    }
}

/// Window size for `count` candles of the interval named by `label`.
pub fn window_millis(label: &str, count: u32) -> Result<i64, DataError> {
    Ok(Interval::parse(label)?.window_millis(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_labels() {
        assert_eq!(window_millis("1", 1).unwrap(), 60_000);
        assert_eq!(window_millis("15", 200).unwrap(), 200 * 15 * 60_000);
        assert_eq!(window_millis("720", 2).unwrap(), 2 * 720 * 60_000);
    }

    #[test]
    fn day_week_month_labels() {
        assert_eq!(window_millis("D", 5).unwrap(), 5 * 86_400_000);
        assert_eq!(window_millis("W", 2).unwrap(), 14 * 86_400_000);
        assert_eq!(window_millis("M", 1).unwrap(), 30 * 86_400_000);
    }

    #[test]
    fn titles_are_aliases() {
        assert_eq!(Interval::parse("15m").unwrap(), Interval::M15);
        assert_eq!(Interval::parse("1D").unwrap(), Interval::D1);
        assert_eq!(Interval::parse("1W").unwrap(), Interval::W1);
        assert_eq!(Interval::parse("1M").unwrap(), Interval::Month1);
        assert_eq!(Interval::parse("1m").unwrap(), Interval::M1);
        assert_eq!(Interval::parse("60").unwrap(), Interval::H1);
    }

    #[test]
    fn unsupported_label_is_error() {
        for label in ["2", "90", "Y", "", "1h"] {
            match Interval::parse(label) {
                Err(DataError::UnsupportedInterval(l)) => assert_eq!(l, label),
                other => panic!("expected UnsupportedInterval for {label:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn api_code_round_trips() {
        for iv in Interval::ALL {
            assert_eq!(Interval::parse(iv.api_code()).unwrap(), iv);
        }
    }
}
