//! Export — CSV, JSON and Parquet renderings of a dataset.
//!
//! Every format carries the same table: `timestamp`, `datetime`, the five
//! OHLCV columns, then the indicator columns in the order they were
//! attached. Null indicator values are an empty CSV cell, a JSON `null` and
//! a Parquet null.
//!
//! JSON embeds the metadata block. CSV and Parquet get it as a
//! `<file>.meta.json` sidecar next to the data file.

use crate::data::DataError;
use crate::domain::{Category, Dataset};
use chrono::DateTime;
use polars::prelude::{Column, DataFrame, ParquetWriter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const BASE_COLUMNS: [&str; 7] = ["timestamp", "datetime", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Parquet => "parquet",
        }
    }

    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            other => Err(DataError::Export(format!("unknown export format '{other}'"))),
        }
    }
}

/// Description of an exported dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub name: String,
    pub symbol: String,
    pub category: Category,
    pub interval: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    /// BLAKE3 fingerprint of the rows.
    pub fingerprint: String,
}

impl ExportMetadata {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            name: dataset.name.clone(),
            symbol: dataset.symbol.clone(),
            category: dataset.category,
            interval: dataset.interval.api_code().to_string(),
            rows: dataset.len(),
            columns: header(dataset),
            first_timestamp: dataset.first_timestamp(),
            last_timestamp: dataset.last_timestamp(),
            fingerprint: dataset.fingerprint(),
        }
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    timestamp: i64,
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(flatten)]
    values: &'a BTreeMap<String, Option<f64>>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    metadata: ExportMetadata,
    rows: Vec<JsonRow<'a>>,
}

/// Full column header of the exported table.
pub fn header(dataset: &Dataset) -> Vec<String> {
    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(dataset.columns().iter().cloned())
        .collect()
}

/// UTC `YYYY-MM-DD HH:MM:SS` for an epoch-ms timestamp.
pub fn format_datetime(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn to_csv(dataset: &Dataset) -> Result<String, DataError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header(dataset)).map_err(csv_error)?;

    for row in dataset.rows() {
        let mut record = vec![
            row.timestamp.to_string(),
            format_datetime(row.timestamp),
            row.open.to_string(),
            row.high.to_string(),
            row.low.to_string(),
            row.close.to_string(),
            row.volume.to_string(),
        ];
        record.extend(
            dataset
                .columns()
                .iter()
                .map(|c| row.value(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(csv_error)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| DataError::Export(format!("csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DataError::Export(format!("csv encoding: {e}")))
}

pub fn to_json(dataset: &Dataset) -> Result<String, DataError> {
    let rows = dataset
        .rows()
        .iter()
        .map(|c| JsonRow {
            timestamp: c.timestamp,
            datetime: format_datetime(c.timestamp),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            values: &c.values,
        })
        .collect();
    let doc = JsonDocument {
        metadata: ExportMetadata::of(dataset),
        rows,
    };
    serde_json::to_string_pretty(&doc).map_err(|e| DataError::Export(format!("json: {e}")))
}

/// Build the exported table as a polars `DataFrame`.
pub fn to_dataframe(dataset: &Dataset) -> Result<DataFrame, DataError> {
    let rows = dataset.rows();
    let timestamps: Vec<i64> = rows.iter().map(|c| c.timestamp).collect();
    let datetimes: Vec<String> = rows.iter().map(|c| format_datetime(c.timestamp)).collect();

    let mut columns = vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("datetime".into(), datetimes),
        Column::new("open".into(), rows.iter().map(|c| c.open).collect::<Vec<f64>>()),
        Column::new("high".into(), rows.iter().map(|c| c.high).collect::<Vec<f64>>()),
        Column::new("low".into(), rows.iter().map(|c| c.low).collect::<Vec<f64>>()),
        Column::new("close".into(), rows.iter().map(|c| c.close).collect::<Vec<f64>>()),
        Column::new("volume".into(), rows.iter().map(|c| c.volume).collect::<Vec<f64>>()),
    ];
    for name in dataset.columns() {
        columns.push(Column::new(name.as_str().into(), dataset.column(name)));
    }

    DataFrame::new(columns).map_err(|e| DataError::Export(format!("dataframe creation: {e}")))
}

/// Path of the metadata sidecar written next to `path`.
pub fn metadata_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".meta.json");
    path.with_file_name(name)
}

/// Write `dataset` to `path` in `format` and return its metadata.
pub fn write(dataset: &Dataset, path: &Path, format: ExportFormat) -> Result<ExportMetadata, DataError> {
    let metadata = ExportMetadata::of(dataset);
    match format {
        ExportFormat::Csv => {
            write_file(path, to_csv(dataset)?.as_bytes())?;
            write_metadata(path, &metadata)?;
        }
        ExportFormat::Json => write_file(path, to_json(dataset)?.as_bytes())?,
        ExportFormat::Parquet => {
            let mut df = to_dataframe(dataset)?;
            let mut file = File::create(path)
                .map_err(|e| DataError::Export(format!("create {}: {e}", path.display())))?;
            ParquetWriter::new(&mut file)
                .finish(&mut df)
                .map_err(|e| DataError::Export(format!("parquet write: {e}")))?;
            write_metadata(path, &metadata)?;
        }
    }

    info!(
        path = %path.display(),
        format = format.extension(),
        rows = metadata.rows,
        fingerprint = %metadata.fingerprint,
        "exported dataset"
    );
    Ok(metadata)
}

fn write_metadata(path: &Path, metadata: &ExportMetadata) -> Result<(), DataError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| DataError::Export(format!("metadata: {e}")))?;
    write_file(&metadata_path(path), json.as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), DataError> {
    std::fs::write(path, contents)
        .map_err(|e| DataError::Export(format!("write {}: {e}", path.display())))
}

fn csv_error(e: csv::Error) -> DataError {
    DataError::Export(format!("csv: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use crate::interval::{Interval, DAY_MS};
    use polars::prelude::{ParquetReader, SerReader};

    fn sample() -> Dataset {
        let mut ds = Dataset::new("BTCUSDT at 1D", "BTCUSDT", Category::Linear, Interval::D1);
        for i in 0..3 {
            ds.push(Candle::new(i * DAY_MS, 1.0, 2.0, 0.5, 1.5 + i as f64, 10.0));
        }
        ds.set_column("SMA", &[None, Some(2.0), Some(2.5)]);
        ds
    }

    #[test]
    fn format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("pq".parse::<ExportFormat>().unwrap(), ExportFormat::Parquet);
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::from_path(Path::new("out/a.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn csv_has_header_and_empty_nulls() {
        let csv = to_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,datetime,open,high,low,close,volume,SMA");
        assert_eq!(lines[1], "0,1970-01-01 00:00:00,1,2,0.5,1.5,10,");
        assert_eq!(lines[3], "172800000,1970-01-03 00:00:00,1,2,0.5,3.5,10,2.5");
    }

    #[test]
    fn json_embeds_metadata() {
        let ds = sample();
        let json: serde_json::Value = serde_json::from_str(&to_json(&ds).unwrap()).unwrap();
        assert_eq!(json["metadata"]["rows"], 3);
        assert_eq!(json["metadata"]["interval"], "D");
        assert_eq!(json["metadata"]["fingerprint"], ds.fingerprint());
        assert!(json["rows"][0]["SMA"].is_null());
        assert_eq!(json["rows"][2]["SMA"], 2.5);
    }

    #[test]
    fn write_csv_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc.csv");
        let meta = write(&sample(), &path, ExportFormat::Csv).unwrap();
        assert!(path.exists());
        let sidecar = std::fs::read_to_string(metadata_path(&path)).unwrap();
        let parsed: ExportMetadata = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(parsed, meta);
        assert_eq!(metadata_path(&path).file_name().unwrap(), "btc.csv.meta.json");
    }

    #[test]
    fn parquet_round_trip_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc.parquet");
        write(&sample(), &path, ExportFormat::Parquet).unwrap();

        let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 8);
        assert_eq!(df.column("SMA").unwrap().null_count(), 1);
    }
}
