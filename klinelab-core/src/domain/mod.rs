//! Domain types shared by the fetcher and the indicator engine.

pub mod candle;
pub mod dataset;
pub mod progress;
pub mod request;

pub use candle::{Candle, InputRole};
pub use dataset::Dataset;
pub use progress::{
    CancelToken, ChannelProgress, LogProgress, NoProgress, ProgressEvent, ProgressSink,
    ProgressStatus,
};
pub use request::{
    format_date, parse_timestamp, Category, FetchRequest, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT,
};
