//! Structured error types for data acquisition.
//!
//! These are designed to be displayable in CLI contexts. An empty upstream
//! answer is not an error: the fetcher reports it as `FetchOutcome::Empty`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported interval: '{0}'")]
    UnsupportedInterval(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { status: u16, endpoint: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("export error: {0}")]
    Export(String),
}
