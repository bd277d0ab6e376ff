//! Page source trait — one bounded kline request per call.
//!
//! The fetcher drives a `KlineSource` forward in time. Implementations
//! handle the transport and decode rows into `Candle`s at the boundary;
//! the fetcher never sees positional arrays. Swapping the source is how
//! tests run the pagination loop without a network.

use super::error::DataError;
use crate::domain::{Candle, FetchRequest};
use serde::Serialize;

/// Query for one page of candles covering `[start, end]`.
///
/// Field order is the JSON order used for the request signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KlineQuery {
    pub category: String,
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
    pub start: i64,
    pub end: i64,
}

impl KlineQuery {
    pub fn for_window(request: &FetchRequest, start: i64, end: i64) -> Self {
        Self {
            category: request.category.as_str().to_string(),
            symbol: request.symbol.clone(),
            interval: request.interval.api_code().to_string(),
            limit: request.limit,
            start,
            end,
        }
    }

    /// JSON payload used for signing.
    pub fn to_payload(&self) -> Result<String, DataError> {
        serde_json::to_string(self)
            .map_err(|e| DataError::InvalidRequest(format!("query serialization: {e}")))
    }
}

/// Decoded answer to one page request.
#[derive(Debug, Clone, PartialEq)]
pub enum KlinePage {
    /// Candles in the order the upstream API returned them (newest first).
    Candles(Vec<Candle>),
    /// The response parsed, but carried no usable kline list.
    Malformed(String),
}

/// A source of kline pages.
pub trait KlineSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Issue one request. Transport and decoding failures are errors; an
    /// answer without a kline list is `KlinePage::Malformed`.
    fn fetch_page(&self, query: &KlineQuery) -> Result<KlinePage, DataError>;
}

impl<S: KlineSource + ?Sized> KlineSource for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<KlinePage, DataError> {
        (**self).fetch_page(query)
    }
}
