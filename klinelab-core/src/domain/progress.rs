//! Progress events and cooperative cancellation.
//!
//! Progress is fire-and-forget: sinks never block the pipeline and never
//! report delivery failures back to it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Ongoing,
    Ended,
}

/// Transient status notification for a long-running fetch or enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    /// 0–100.
    pub progress: u8,
    pub message: String,
}

impl ProgressEvent {
    pub fn ongoing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Ongoing,
            progress: progress.min(100),
            message: message.into(),
        }
    }

    pub fn ended(message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Ended,
            progress: 100,
            message: message.into(),
        }
    }

    pub fn finished() -> Self {
        Self::ended("Finished")
    }

    pub fn failed() -> Self {
        Self::ended("Failed")
    }

    pub fn cancelled() -> Self {
        Self::ended("Cancelled")
    }

    pub fn is_terminal(&self) -> bool {
        self.status == ProgressStatus::Ended
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Writes events to the `tracing` log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: ProgressEvent) {
        tracing::info!(
            status = ?event.status,
            progress = event.progress,
            "{}",
            event.message
        );
    }
}

/// Forwards events over an unbounded channel. A dropped receiver is ignored.
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Shared cancellation flag, checked between pagination rounds and between
/// indicators.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Percentage of `done` out of `total`, rounded to the nearest integer.
pub(crate) fn percent(done: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (done / total * 100.0).round()
}
