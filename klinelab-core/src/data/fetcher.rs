//! Paginated fetcher — rebuilds a complete candle series from bounded pages.
//!
//! The loop walks forward in time from `request.start`. Each round asks the
//! source for one window of at most `limit` candles, merges the page in
//! ascending order, and moves the cursor to one millisecond past the newest
//! candle it kept. Advancing from the last candle rather than the window end
//! means short pages never open a gap.

use super::error::DataError;
use super::source::{KlinePage, KlineQuery, KlineSource};
use crate::domain::progress::percent;
use crate::domain::{format_date, CancelToken, Dataset, FetchRequest, ProgressEvent, ProgressSink};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Result of a fetch that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Complete(Dataset),
    /// The upstream answered with no usable candles. Anything gathered from
    /// earlier pages is discarded.
    Empty,
    Cancelled,
}

impl FetchOutcome {
    pub fn into_dataset(self) -> Option<Dataset> {
        match self {
            FetchOutcome::Complete(ds) => Some(ds),
            FetchOutcome::Empty | FetchOutcome::Cancelled => None,
        }
    }
}

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Drives a `KlineSource` over a request's time range.
pub struct PaginatedFetcher<S> {
    source: S,
    clock: fn() -> i64,
    cancel: CancelToken,
}

impl<S: KlineSource> PaginatedFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: system_clock,
            cancel: CancelToken::new(),
        }
    }

    /// Replace the wall clock used to resolve an open-ended request.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fetch the whole range of `request`.
    ///
    /// Exactly one terminal event is emitted once paging has begun:
    /// "Finished" for `Complete`, "Cancelled" for `Cancelled`, and "Failed"
    /// for `Empty` and for errors. Invalid requests are rejected before any
    /// event or network call.
    pub fn fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, DataError> {
        request.validate()?;
        let end = self.resolve_end(request);
        if request.start > end {
            return Err(DataError::InvalidRequest(format!(
                "start {} is after end {end}",
                request.start
            )));
        }

        info!(
            source = self.source.name(),
            symbol = %request.symbol,
            category = %request.category,
            interval = request.interval.api_code(),
            start = %format_date(request.start),
            end = %format_date(end),
            "fetching klines"
        );

        let result = self.run(request, end, progress);
        match &result {
            Ok(FetchOutcome::Complete(ds)) => {
                info!(symbol = %request.symbol, rows = ds.len(), "fetch finished");
                progress.emit(ProgressEvent::finished());
            }
            Ok(FetchOutcome::Empty) => {
                warn!(symbol = %request.symbol, "fetch returned no data");
                progress.emit(ProgressEvent::failed());
            }
            Ok(FetchOutcome::Cancelled) => {
                info!(symbol = %request.symbol, "fetch cancelled");
                progress.emit(ProgressEvent::cancelled());
            }
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "fetch failed");
                progress.emit(ProgressEvent::failed());
            }
        }
        result
    }

    fn resolve_end(&self, request: &FetchRequest) -> i64 {
        match request.end {
            None => (self.clock)(),
            Some(end) if end >= 0 && DateTime::<Utc>::from_timestamp_millis(end).is_some() => end,
            Some(end) => {
                let now = (self.clock)();
                warn!(end, now, "end is not a valid timestamp, using current time");
                now
            }
        }
    }

    fn run(
        &self,
        request: &FetchRequest,
        end: i64,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, DataError> {
        let total_range = (end - request.start).max(1);
        let window = request.interval.window_millis(request.limit);
        let step = request.interval.millis();

        let mut dataset = Dataset::for_request(request, end);
        let mut cursor = request.start;
        let mut page_no = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(FetchOutcome::Cancelled);
            }

            let window_end = cursor.saturating_add(window).min(end);
            let pct = percent((cursor - request.start) as f64, total_range as f64).clamp(1.0, 99.0);
            progress.emit(ProgressEvent::ongoing(
                pct as u8,
                format!("Fetching {} from {}", request.symbol, format_date(cursor)),
            ));

            let query = KlineQuery::for_window(request, cursor, window_end);
            page_no += 1;
            let mut candles = match self.source.fetch_page(&query)? {
                KlinePage::Candles(c) => c,
                KlinePage::Malformed(reason) => {
                    warn!(page = page_no, %reason, "malformed kline page");
                    return Ok(FetchOutcome::Empty);
                }
            };
            if candles.is_empty() {
                debug!(page = page_no, "empty kline page");
                return Ok(FetchOutcome::Empty);
            }

            // Pages arrive newest first.
            candles.sort_by_key(|c| c.timestamp);
            let received = candles.len();
            let appended = candles
                .into_iter()
                .filter(|c| (request.start..=end).contains(&c.timestamp))
                .map(|c| dataset.push(c))
                .filter(|pushed| *pushed)
                .count();

            debug!(
                page = page_no,
                start = cursor,
                end = window_end,
                received,
                appended,
                "merged kline page"
            );

            let Some(last) = dataset.last_timestamp() else {
                return Ok(FetchOutcome::Empty);
            };
            // `end` is inclusive: a bucket opening exactly at `end` still
            // has to be requested.
            if last >= end || last.saturating_add(step) > end {
                break;
            }
            if window_end == end && received < request.limit as usize {
                debug!(last, received, "short final page, stopping");
                break;
            }
            if appended == 0 {
                debug!(last, "page added no new candles, stopping");
                break;
            }
            cursor = last + 1;
        }

        Ok(FetchOutcome::Complete(dataset))
    }
}
