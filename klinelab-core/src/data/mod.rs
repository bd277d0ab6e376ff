//! Data acquisition: request signing, the Bybit page source, and the
//! paginated fetcher that stitches pages into one dataset.

pub mod bybit;
pub mod error;
pub mod fetcher;
pub mod signer;
pub mod source;

pub use bybit::{parse_page, BybitClient};
pub use error::DataError;
pub use fetcher::{FetchOutcome, PaginatedFetcher};
pub use signer::{auth_headers, HmacSigner, Signer, SigningCredentials};
pub use source::{KlinePage, KlineQuery, KlineSource};
