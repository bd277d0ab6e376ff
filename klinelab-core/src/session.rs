//! Session — the pipeline context between a fetch and its enrichment.
//!
//! A session holds at most one dataset. Both stages take `&mut self`, so a
//! fetch and an enrichment can never run over the same session at once. A
//! stage that does not succeed leaves the held dataset as it was.

use crate::data::{DataError, FetchOutcome, KlineSource, PaginatedFetcher};
use crate::domain::{Dataset, FetchRequest, ProgressSink};
use crate::indicators::{EnrichError, EnrichWarning, IndicatorEngine};
use tracing::debug;

/// How a fetch through a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Complete { rows: usize },
    Empty,
    Cancelled,
}

pub struct Session<'r, S> {
    fetcher: PaginatedFetcher<S>,
    engine: IndicatorEngine<'r>,
    dataset: Option<Dataset>,
}

impl<S: KlineSource> Session<'static, S> {
    /// Session over `source` with the built-in indicator catalog.
    pub fn new(source: S) -> Self {
        Session::with_parts(PaginatedFetcher::new(source), IndicatorEngine::builtin())
    }
}

impl<'r, S: KlineSource> Session<'r, S> {
    pub fn with_parts(fetcher: PaginatedFetcher<S>, engine: IndicatorEngine<'r>) -> Self {
        Self {
            fetcher,
            engine,
            dataset: None,
        }
    }

    /// Fetch `request`. Only a complete fetch replaces the held dataset.
    pub fn fetch(
        &mut self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
    ) -> Result<FetchStatus, DataError> {
        let status = match self.fetcher.fetch(request, progress)? {
            FetchOutcome::Complete(dataset) => {
                let rows = dataset.len();
                self.dataset = Some(dataset);
                FetchStatus::Complete { rows }
            }
            FetchOutcome::Empty => FetchStatus::Empty,
            FetchOutcome::Cancelled => FetchStatus::Cancelled,
        };
        debug!(?status, held = self.dataset.is_some(), "session fetch done");
        Ok(status)
    }

    /// Enrich the held dataset with `names`, replacing it on success.
    pub fn enrich<N: AsRef<str>>(
        &mut self,
        names: &[N],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<EnrichWarning>, EnrichError> {
        let dataset = self.dataset.as_ref().ok_or(EnrichError::NoDataset)?;
        let enriched = self.engine.enrich(dataset, names, progress)?;
        self.dataset = Some(enriched.dataset);
        Ok(enriched.warnings)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn take_dataset(&mut self) -> Option<Dataset> {
        self.dataset.take()
    }

    pub fn fetcher(&self) -> &PaginatedFetcher<S> {
        &self.fetcher
    }

    pub fn engine(&self) -> &IndicatorEngine<'r> {
        &self.engine
    }
}
