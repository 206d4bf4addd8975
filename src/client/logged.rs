/// Fetch-logging decorator for any [`MetricsSource`].
use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use super::{FetchError, MetricsSource};
use crate::analytics::logger::{self, FetchLogEntry};
use crate::metrics::MetricsSnapshot;

/// Wraps a source and appends one [`FetchLogEntry`] per fetch.
///
/// Logging is best-effort; a log write failure never changes the fetch
/// outcome handed back to the caller.
#[derive(Debug)]
pub struct LoggedSource<S> {
    inner: S,
    log_path: PathBuf,
}

impl<S: MetricsSource> LoggedSource<S> {
    /// Log to an explicit file.
    pub fn new(inner: S, log_path: PathBuf) -> Self {
        Self { inner, log_path }
    }

    /// Log to `~/.metricsview/fetch-log.jsonl`; `None` when no home
    /// directory can be resolved.
    pub fn with_default_log(inner: S) -> Option<Self> {
        logger::fetch_log_path().map(|path| Self::new(inner, path))
    }
}

impl<S: MetricsSource> MetricsSource for LoggedSource<S> {
    fn fetch(&self) -> Result<MetricsSnapshot, FetchError> {
        let start = Instant::now();
        let outcome = self.inner.fetch();
        let latency_ms = start.elapsed().as_millis() as u64;

        let entry = FetchLogEntry::from_outcome(&self.inner.describe(), &outcome, latency_ms);
        if let Err(e) = logger::append_entry(&self.log_path, &entry) {
            debug!(path = %self.log_path.display(), error = %e, "fetch log write failed");
        }

        outcome
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}
