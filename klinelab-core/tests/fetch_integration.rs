//! Fetch pipeline tests against in-memory page sources.

use std::sync::Mutex;

use klinelab_core::data::{
    parse_page, DataError, FetchOutcome, KlinePage, KlineQuery, KlineSource, PaginatedFetcher,
};
use klinelab_core::domain::{Candle, Category, FetchRequest, ProgressEvent, ProgressSink, ProgressStatus};
use klinelab_core::interval::{Interval, DAY_MS, MINUTE_MS};

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressEvent>>);

impl Recorder {
    fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }

    fn terminal(&self) -> ProgressEvent {
        let events = self.events();
        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1, "exactly one terminal event: {events:?}");
        terminal[0].clone()
    }
}

impl ProgressSink for Recorder {
    fn emit(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn candle(ts: i64) -> Candle {
    Candle::new(ts, 100.0, 101.0, 99.0, 100.5, 12.0)
}

/// Answers every query with the timestamps in its window, capped at the
/// query limit and ordered newest first, the way the exchange does.
struct Exchange {
    timestamps: Vec<i64>,
    queries: Mutex<Vec<KlineQuery>>,
}

impl Exchange {
    fn new(timestamps: impl IntoIterator<Item = i64>) -> Self {
        Self {
            timestamps: timestamps.into_iter().collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl KlineSource for Exchange {
    fn name(&self) -> &str {
        "exchange"
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<KlinePage, DataError> {
        self.queries.lock().unwrap().push(query.clone());
        let mut page: Vec<Candle> = self
            .timestamps
            .iter()
            .copied()
            .filter(|ts| *ts >= query.start && *ts <= query.end)
            .take(query.limit as usize)
            .map(candle)
            .collect();
        page.reverse();
        Ok(KlinePage::Candles(page))
    }
}

/// Replays canned JSON bodies through the real page parser.
struct Replay(Vec<&'static str>, Mutex<usize>);

impl KlineSource for Replay {
    fn name(&self) -> &str {
        "replay"
    }

    fn fetch_page(&self, _query: &KlineQuery) -> Result<KlinePage, DataError> {
        let mut i = self.1.lock().unwrap();
        let body = self.0[(*i).min(self.0.len() - 1)];
        *i += 1;
        parse_page(body)
    }
}

struct Offline;

impl KlineSource for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch_page(&self, _query: &KlineQuery) -> Result<KlinePage, DataError> {
        Err(DataError::NetworkUnreachable("connection refused".into()))
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn five_daily_candles_in_one_page() {
    let t0 = 1_700_006_400_000;
    let source = Exchange::new((0..5).map(|i| t0 + i * DAY_MS));
    let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::D1, t0)
        .with_limit(200)
        .with_end(t0 + 5 * DAY_MS);
    let progress = Recorder::default();

    let outcome = PaginatedFetcher::new(&source).fetch(&request, &progress).unwrap();
    let ds = outcome.into_dataset().expect("complete");

    let timestamps: Vec<i64> = ds.rows().iter().map(|c| c.timestamp).collect();
    assert_eq!(timestamps, (0..5).map(|i| t0 + i * DAY_MS).collect::<Vec<_>>());
    assert_eq!(source.query_count(), 1);

    let terminal = progress.terminal();
    assert_eq!(terminal.status, ProgressStatus::Ended);
    assert_eq!(terminal.progress, 100);
    assert_eq!(terminal.message, "Finished");
    assert_eq!(ds.name, "BTCUSDT at 1D from 2023-11-15 to 2023-11-20");
}

#[test]
fn full_pages_without_duplicates() {
    let start = 0;
    let end = 2_500 * MINUTE_MS;
    let source = Exchange::new((0..=2_500).map(|i| i * MINUTE_MS));
    let request = FetchRequest::new(Category::Spot, "ETHUSDT", Interval::M1, start)
        .with_limit(1000)
        .with_end(end);

    let ds = PaginatedFetcher::new(&source)
        .fetch(&request, &Recorder::default())
        .unwrap()
        .into_dataset()
        .unwrap();

    assert_eq!(ds.len(), 2_501);
    assert_eq!(ds.rows().first().map(|c| c.timestamp), Some(start));
    assert_eq!(ds.last_timestamp(), Some(end));
    assert!(ds.rows().windows(2).all(|w| w[1].timestamp - w[0].timestamp == MINUTE_MS));
    assert_eq!(source.query_count(), 3);
}

#[test]
fn page_boundary_next_to_end_keeps_last_candle() {
    let end = 200 * MINUTE_MS;
    for limit in [100, 199, 200, 1000] {
        let source = Exchange::new((0..=200).map(|i| i * MINUTE_MS));
        let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::M1, 0)
            .with_limit(limit)
            .with_end(end);

        let ds = PaginatedFetcher::new(&source)
            .fetch(&request, &Recorder::default())
            .unwrap()
            .into_dataset()
            .unwrap();

        assert_eq!(ds.len(), 201, "limit {limit}");
        assert_eq!(ds.last_timestamp(), Some(end), "limit {limit}");
        assert!(ds.rows().windows(2).all(|w| w[1].timestamp - w[0].timestamp == MINUTE_MS));
    }
}

#[test]
fn empty_first_page_is_empty_outcome() {
    let source = Exchange::new(Vec::new());
    let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::H1, 0).with_end(DAY_MS);
    let progress = Recorder::default();

    let outcome = PaginatedFetcher::new(&source).fetch(&request, &progress).unwrap();
    assert_eq!(outcome, FetchOutcome::Empty);
    assert_eq!(progress.terminal().message, "Failed");
}

#[test]
fn malformed_page_discards_partial_data() {
    let first = r#"{"retCode":0,"retMsg":"OK","result":{"list":[
        ["7200000","1","2","0.5","1.5","10","15"],
        ["3600000","1","2","0.5","1.5","10","15"],
        ["0","1","2","0.5","1.5","10","15"]]}}"#;
    let second = r#"{"retCode":10001,"retMsg":"params error","result":{}}"#;
    let source = Replay(vec![first, second], Mutex::new(0));
    let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::H1, 0)
        .with_limit(100)
        .with_end(DAY_MS);
    let progress = Recorder::default();

    let outcome = PaginatedFetcher::new(source).fetch(&request, &progress).unwrap();
    assert_eq!(outcome, FetchOutcome::Empty);
    assert_eq!(progress.terminal().message, "Failed");
}

#[test]
fn transport_error_fails_with_event() {
    let request = FetchRequest::new(Category::Inverse, "BTCUSD", Interval::D1, 0).with_end(10 * DAY_MS);
    let progress = Recorder::default();

    let err = PaginatedFetcher::new(Offline).fetch(&request, &progress).unwrap_err();
    assert!(matches!(err, DataError::NetworkUnreachable(_)));
    let events = progress.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].status, ProgressStatus::Ongoing);
    assert_eq!(events[1].message, "Failed");
}

#[test]
fn ongoing_progress_advances() {
    let source = Exchange::new((0..300).map(|i| i * MINUTE_MS));
    let request = FetchRequest::new(Category::Linear, "BTCUSDT", Interval::M1, 0)
        .with_limit(100)
        .with_end(299 * MINUTE_MS);
    let progress = Recorder::default();

    PaginatedFetcher::new(&source).fetch(&request, &progress).unwrap();
    let ongoing: Vec<u8> = progress
        .events()
        .iter()
        .filter(|e| !e.is_terminal())
        .map(|e| e.progress)
        .collect();
    assert_eq!(ongoing.len(), 3);
    assert!(ongoing.windows(2).all(|w| w[0] < w[1]));
    assert!(ongoing.iter().all(|p| (1..=99).contains(p)));
    assert!(progress.events()[0].message.starts_with("Fetching BTCUSDT from 1970-01-01"));
}
