//! KlineLab Core — paginated kline fetching and indicator enrichment.
//!
//! This crate contains the whole pipeline:
//! - Interval calendar and domain types (candles, datasets, requests, progress)
//! - Request signing and the Bybit page source
//! - Paginated fetcher that stitches bounded pages into one ordered dataset
//! - Indicator math, the descriptor registry and the enrichment engine
//! - Session context, configuration and export

pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod indicators;
pub mod interval;
pub mod session;

pub use config::{ApiConfig, AppConfig, Credentials};
pub use data::{BybitClient, DataError, FetchOutcome, KlineSource, PaginatedFetcher};
pub use domain::{CancelToken, Candle, Category, Dataset, FetchRequest, ProgressEvent, ProgressSink};
pub use export::ExportFormat;
pub use indicators::{EnrichError, Enriched, IndicatorEngine, IndicatorRegistry, PruneMode};
pub use interval::Interval;
pub use session::{FetchStatus, Session};

#[cfg(test)]
mod tests {
    use super::*;

    /// The CLI hands datasets and sinks across worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Dataset>();
        require_sync::<Dataset>();
        require_send::<Candle>();
        require_sync::<Candle>();
        require_send::<FetchRequest>();
        require_sync::<FetchRequest>();
        require_send::<ProgressEvent>();
        require_send::<CancelToken>();
        require_sync::<CancelToken>();
        require_send::<IndicatorRegistry>();
        require_sync::<IndicatorRegistry>();
        require_send::<IndicatorEngine<'static>>();
        require_sync::<IndicatorEngine<'static>>();
        require_send::<PaginatedFetcher<BybitClient>>();
        require_sync::<PaginatedFetcher<BybitClient>>();
        require_send::<DataError>();
        require_send::<EnrichError>();
    }
}
