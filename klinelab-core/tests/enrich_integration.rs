//! Enrichment scenarios over fetched datasets.

use klinelab_core::data::{DataError, KlinePage, KlineQuery, KlineSource};
use klinelab_core::domain::{Candle, Category, Dataset, FetchRequest, NoProgress};
use klinelab_core::indicators::{
    EnrichWarning, IndicatorConfig, IndicatorEngine, IndicatorRegistry, PruneMode,
};
use klinelab_core::interval::{Interval, DAY_MS};
use klinelab_core::session::{FetchStatus, Session};

fn series(closes: &[f64]) -> Dataset {
    let mut ds = Dataset::new("test", "BTCUSDT", Category::Linear, Interval::D1);
    for (i, close) in closes.iter().enumerate() {
        ds.push(Candle::new(i as i64 * DAY_MS, *close, close + 2.0, close - 2.0, *close, 1_000.0 + i as f64));
    }
    ds
}

fn wave(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + (i as f64 * 0.2).sin() * 8.0 + i as f64 * 0.05).collect()
}

#[test]
fn sma5_on_ten_rows() {
    let ds = series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0]);
    let registry = IndicatorRegistry::builtin()
        .clone()
        .with_config("SMA", IndicatorConfig::with_period(5))
        .unwrap();

    let out = IndicatorEngine::new(&registry).enrich(&ds, &["SMA"], &NoProgress).unwrap();
    let timestamps: Vec<i64> = out.dataset.rows().iter().map(|c| c.timestamp).collect();
    assert_eq!(timestamps, (4..10).map(|i| i * DAY_MS).collect::<Vec<_>>());
    assert_eq!(out.dataset.column("SMA"), vec![Some(12.0), Some(13.0), Some(14.0), Some(15.0), Some(16.0), Some(17.0)]);
}

#[test]
fn unknown_indicator_does_not_fail() {
    let ds = series(&wave(50));
    let out = IndicatorEngine::builtin()
        .enrich(&ds, &["SMA", "NOT_A_REAL_INDICATOR"], &NoProgress)
        .unwrap();
    assert!(out.dataset.rows().iter().all(|c| c.value("SMA").is_some()));
    assert_eq!(out.warnings, vec![EnrichWarning::UnknownIndicator("NOT_A_REAL_INDICATOR".into())]);
}

#[test]
fn enrichment_is_deterministic() {
    let ds = series(&wave(200));
    let names = ["SMA", "RSI", "MACD", "BB", "ATR", "OBV"];
    let a = IndicatorEngine::builtin().enrich(&ds, &names, &NoProgress).unwrap();
    let b = IndicatorEngine::builtin().enrich(&ds, &names, &NoProgress).unwrap();
    assert_eq!(a.dataset, b.dataset);
    assert_eq!(a.dataset.fingerprint(), b.dataset.fingerprint());
}

#[test]
fn every_builtin_enriches_a_long_series() {
    let ds = series(&wave(300));
    let names = IndicatorRegistry::builtin().names();
    let out = IndicatorEngine::builtin()
        .with_prune_mode(PruneMode::Final)
        .enrich(&ds, names.as_slice(), &NoProgress)
        .unwrap();
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    assert!(!out.dataset.is_empty());
    assert!(out.dataset.columns().len() > names.len());
    assert!(out.dataset.rows().iter().all(|c| !c.has_null()));
}

#[test]
fn values_rounded_to_two_decimals() {
    let ds = series(&wave(60));
    let out = IndicatorEngine::builtin().enrich(&ds, &["EMA", "RSI"], &NoProgress).unwrap();
    for row in out.dataset.rows() {
        for column in out.dataset.columns() {
            let v = row.value(column).unwrap();
            assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6, "{column}={v}");
        }
    }
}

struct Daily(i64);

impl KlineSource for Daily {
    fn name(&self) -> &str {
        "daily"
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<KlinePage, DataError> {
        let closes = wave(self.0 as usize);
        let mut page: Vec<Candle> = (0..self.0)
            .map(|i| (i, i * DAY_MS))
            .filter(|(_, ts)| *ts >= query.start && *ts <= query.end)
            .map(|(i, ts)| {
                let c = closes[i as usize];
                Candle::new(ts, c, c + 1.0, c - 1.0, c, 500.0)
            })
            .collect();
        page.reverse();
        Ok(KlinePage::Candles(page))
    }
}

#[test]
fn session_fetch_enrich_export() {
    let mut session = Session::new(Daily(120));
    let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::D1, 0)
        .with_limit(100)
        .with_end(119 * DAY_MS);

    assert_eq!(session.fetch(&request, &NoProgress).unwrap(), FetchStatus::Complete { rows: 120 });
    let warnings = session.enrich(&["macd", "STOCH"], &NoProgress).unwrap();
    assert!(warnings.is_empty());

    let ds = session.dataset().unwrap();
    assert_eq!(
        ds.columns(),
        ["MACD_MACD", "MACD_SIGNAL", "MACD_HISTOGRAM", "STOCH_K", "STOCH_D"]
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("btc.csv");
    let meta = klinelab_core::export::write(ds, &path, klinelab_core::ExportFormat::Csv).unwrap();
    assert_eq!(meta.rows, ds.len());
    let csv = std::fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), ds.len() + 1);
}
