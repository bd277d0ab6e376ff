//! Indicator engine — binds selected indicators to dataset columns and
//! merges their results back into the rows.
//!
//! An enrichment works on a private copy of the dataset and is all or
//! nothing: a compute error discards every column written so far and the
//! caller keeps its original dataset. Unknown names and results of an
//! unexpected shape only produce warnings.
//!
//! After each indicator, rows holding any null are dropped
//! ([`PruneMode::Progressive`]), so a later indicator sees the series already
//! shortened by the warm-up of earlier ones and selection order can change
//! which rows survive. [`PruneMode::Final`] computes every indicator over the
//! full series and prunes once at the end.

use super::params::IndicatorError;
use super::registry::IndicatorRegistry;
use crate::domain::{CancelToken, Dataset, ProgressEvent, ProgressSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneMode {
    #[default]
    Progressive,
    Final,
}

/// Non-fatal problem with one selected indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichWarning {
    UnknownIndicator(String),
    UnexpectedResultShape { name: String, shape: &'static str },
}

impl fmt::Display for EnrichWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichWarning::UnknownIndicator(name) => write!(f, "unknown indicator '{name}', skipped"),
            EnrichWarning::UnexpectedResultShape { name, shape } => {
                write!(f, "indicator '{name}' returned an unusable {shape}, skipped")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("no dataset to enrich")]
    NoDataset,

    #[error("indicator '{name}' failed: {source}")]
    Indicator {
        name: String,
        #[source]
        source: IndicatorError,
    },

    #[error("enrichment cancelled")]
    Cancelled,
}

/// A successful enrichment.
#[derive(Debug, Clone)]
pub struct Enriched {
    pub dataset: Dataset,
    pub warnings: Vec<EnrichWarning>,
    /// Rows dropped by pruning.
    pub pruned: usize,
}

/// Rounding and null policy for stored indicator values.
pub fn store_value(value: f64) -> Option<f64> {
    value.is_finite().then(|| (value * 100.0).round() / 100.0)
}

pub struct IndicatorEngine<'r> {
    registry: &'r IndicatorRegistry,
    prune: PruneMode,
    cancel: CancelToken,
}

impl IndicatorEngine<'static> {
    /// Engine over the built-in catalog.
    pub fn builtin() -> Self {
        IndicatorEngine::new(IndicatorRegistry::builtin())
    }
}

impl<'r> IndicatorEngine<'r> {
    pub fn new(registry: &'r IndicatorRegistry) -> Self {
        Self {
            registry,
            prune: PruneMode::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_prune_mode(mut self, prune: PruneMode) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &'r IndicatorRegistry {
        self.registry
    }

    pub fn prune_mode(&self) -> PruneMode {
        self.prune
    }

    /// Compute `names` in order over `dataset` and return the enriched copy.
    ///
    /// Ends with a "Finished", "Failed" or "Cancelled" event. An empty
    /// dataset is rejected with `NoDataset` before any event.
    pub fn enrich<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        names: &[S],
        progress: &dyn ProgressSink,
    ) -> Result<Enriched, EnrichError> {
        if dataset.is_empty() {
            return Err(EnrichError::NoDataset);
        }

        info!(
            dataset = %dataset.name,
            rows = dataset.len(),
            indicators = names.len(),
            prune = ?self.prune,
            "enriching dataset"
        );

        let result = self.run(dataset, names, progress);
        match &result {
            Ok(enriched) => {
                info!(
                    rows = enriched.dataset.len(),
                    columns = enriched.dataset.columns().len(),
                    pruned = enriched.pruned,
                    warnings = enriched.warnings.len(),
                    "enrichment finished"
                );
                progress.emit(ProgressEvent::finished());
            }
            Err(EnrichError::Cancelled) => {
                info!("enrichment cancelled");
                progress.emit(ProgressEvent::cancelled());
            }
            Err(e) => {
                warn!(error = %e, "enrichment failed");
                progress.emit(ProgressEvent::failed());
            }
        }
        result
    }

    fn run<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        names: &[S],
        progress: &dyn ProgressSink,
    ) -> Result<Enriched, EnrichError> {
        let mut working = dataset.clone();
        let mut warnings = Vec::new();
        let mut pruned = 0;
        let total = names.len().max(1) as f64;

        for (i, requested) in names.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(EnrichError::Cancelled);
            }

            let requested = requested.as_ref();
            let Some(descriptor) = self.registry.lookup(requested) else {
                warn!(indicator = requested, "unknown indicator, skipping");
                warnings.push(EnrichWarning::UnknownIndicator(requested.to_string()));
                continue;
            };
            let name = descriptor.name;

            let pct = (i as f64 / total * 99.0).round() as u8;
            progress.emit(ProgressEvent::ongoing(pct, format!("Calculating {name}")));

            // Until the final pass nothing is pruned in Final mode, so the
            // working rows are the pre-enrichment rows.
            let series: Vec<Vec<f64>> = descriptor
                .inputs
                .iter()
                .map(|role| working.series(*role))
                .collect();
            let inputs: Vec<&[f64]> = series.iter().map(Vec::as_slice).collect();

            let output = descriptor
                .invoke(&inputs)
                .map_err(|source| EnrichError::Indicator {
                    name: name.to_string(),
                    source,
                })?
                .unwrap_nested();

            let shape = output.describe();
            let Some(columns) = output.into_columns(name, working.len()) else {
                warn!(indicator = name, shape, "unexpected result shape, skipping");
                warnings.push(EnrichWarning::UnexpectedResultShape {
                    name: name.to_string(),
                    shape,
                });
                continue;
            };

            for (column, values) in &columns {
                let cells: Vec<Option<f64>> = values.iter().map(|v| store_value(*v)).collect();
                working.set_column(column, &cells);
            }

            if self.prune == PruneMode::Progressive {
                let removed = working.prune_nulls();
                pruned += removed;
                debug!(indicator = name, columns = columns.len(), removed, rows = working.len(), "merged indicator");
            } else {
                debug!(indicator = name, columns = columns.len(), "merged indicator");
            }
        }

        if self.prune == PruneMode::Final {
            pruned += working.prune_nulls();
        }

        Ok(Enriched {
            dataset: working,
            warnings,
            pruned,
        })
    }
}
