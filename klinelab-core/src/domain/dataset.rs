//! Dataset — an ordered candle series plus the indicator columns attached to it.
//!
//! Rows are kept ascending by timestamp with no duplicates. Indicator columns
//! are registered once on the dataset and written into every row, so a column
//! name is always present on all rows or on none.

use super::candle::{Candle, InputRole};
use super::request::{format_date, Category, FetchRequest};
use crate::interval::Interval;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub symbol: String,
    pub category: Category,
    pub interval: Interval,
    columns: Vec<String>,
    rows: Vec<Candle>,
}

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        category: Category,
        interval: Interval,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            category,
            interval,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Empty dataset for a request, named after its symbol, interval and range.
    pub fn for_request(request: &FetchRequest, resolved_end: i64) -> Self {
        let name = format!(
            "{} at {} from {} to {}",
            request.symbol,
            request.interval.title(),
            format_date(request.start),
            format_date(resolved_end)
        );
        Self::new(name, request.symbol.clone(), request.category, request.interval)
    }

    /// Append a candle. Returns `false` (and drops it) unless it is strictly
    /// newer than the current last row.
    pub fn push(&mut self, mut candle: Candle) -> bool {
        if let Some(last) = self.rows.last() {
            if candle.timestamp <= last.timestamp {
                return false;
            }
        }
        for column in &self.columns {
            candle.values.entry(column.clone()).or_insert(None);
        }
        self.rows.push(candle);
        true
    }

    pub fn rows(&self) -> &[Candle] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indicator column names in the order they were attached.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.rows.first().map(|c| c.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.rows.last().map(|c| c.timestamp)
    }

    /// Extract one price/volume column as a dense series.
    pub fn series(&self, role: InputRole) -> Vec<f64> {
        self.rows.iter().map(|c| c.field(role)).collect()
    }

    /// Extract an indicator column. Missing columns read as all-null.
    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|c| c.value(name)).collect()
    }

    /// Write one value per row positionally, registering the column if new.
    ///
    /// # Panics
    /// If `values.len()` differs from the row count.
    pub fn set_column(&mut self, name: &str, values: &[Option<f64>]) {
        assert_eq!(
            values.len(),
            self.rows.len(),
            "column '{name}' has {} values for {} rows",
            values.len(),
            self.rows.len()
        );
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.insert(name.to_string(), *value);
        }
    }

    /// Drop every row holding a null attribute. Returns the number removed.
    pub fn prune_nulls(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|c| !c.has_null());
        before - self.rows.len()
    }

    /// Content hash of the rows and columns (BLAKE3, hex).
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update(&[0]);
        }
        for row in &self.rows {
            hasher.update(&row.timestamp.to_le_bytes());
            for v in [row.open, row.high, row.low, row.close, row.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
            for column in &self.columns {
                match row.value(column) {
                    Some(v) => hasher.update(&v.to_bits().to_le_bytes()),
                    None => hasher.update(b"null"),
                };
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, 10.0)
    }

    fn dataset(n: usize) -> Dataset {
        let mut ds = Dataset::new("test", "BTCUSDT", Category::Linear, Interval::M1);
        for i in 0..n {
            assert!(ds.push(candle(i as i64 * 60_000, 100.0 + i as f64)));
        }
        ds
    }

    #[test]
    fn push_rejects_out_of_order_and_duplicates() {
        let mut ds = dataset(3);
        assert!(!ds.push(candle(60_000, 1.0)));
        assert!(!ds.push(candle(120_000, 1.0)));
        assert!(ds.push(candle(180_000, 1.0)));
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn name_from_request() {
        let req = FetchRequest::new(Category::Spot, "ETHUSDT", Interval::D1, 0);
        let ds = Dataset::for_request(&req, 5 * 86_400_000);
        assert_eq!(ds.name, "ETHUSDT at 1D from 1970-01-01 to 1970-01-06");
        assert!(ds.is_empty());
    }

    #[test]
    fn set_column_registers_once() {
        let mut ds = dataset(3);
        ds.set_column("SMA", &[None, Some(1.0), Some(2.0)]);
        ds.set_column("SMA", &[Some(0.5), Some(1.0), Some(2.0)]);
        assert_eq!(ds.columns(), ["SMA".to_string()]);
        assert_eq!(ds.column("SMA"), vec![Some(0.5), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn push_after_columns_fills_nulls() {
        let mut ds = dataset(1);
        ds.set_column("RSI", &[Some(50.0)]);
        ds.push(candle(999_999, 1.0));
        assert!(ds.rows()[1].values.contains_key("RSI"));
        assert_eq!(ds.rows()[1].value("RSI"), None);
    }

    #[test]
    fn prune_drops_rows_with_nulls() {
        let mut ds = dataset(4);
        ds.set_column("A", &[None, Some(1.0), Some(1.0), Some(1.0)]);
        ds.set_column("B", &[Some(1.0), None, Some(1.0), Some(1.0)]);
        assert_eq!(ds.prune_nulls(), 2);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.first_timestamp(), Some(120_000));
    }

    #[test]
    fn series_extraction() {
        let ds = dataset(3);
        assert_eq!(ds.series(InputRole::Close), vec![100.0, 101.0, 102.0]);
        assert_eq!(ds.series(InputRole::High), vec![101.0, 102.0, 103.0]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = dataset(3);
        let mut b = dataset(3);
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.set_column("X", &[None, None, Some(1.0)]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
