/// Metrics endpoint client.
///
/// The view never talks HTTP directly: it pulls snapshots through the
/// [`MetricsSource`] trait. [`HttpMetricsClient`] is the production source,
/// a blocking `ureq` client against `GET {base_url}{path}`.
/// [`logged::LoggedSource`] wraps any source and records each fetch in the
/// JSONL fetch log.
use std::time::Duration;

use tracing::debug;

use crate::config::schema::EndpointConfig;
use crate::metrics::{MetricsEnvelope, MetricsSnapshot};

pub mod logged;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a fetch produced no usable snapshot.
///
/// All variants collapse into the same "fetch unusable" outcome at the view
/// boundary; they are kept apart for diagnostics and the fetch log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("malformed metrics payload: {0}")]
    Decode(String),

    #[error("metrics payload has no `data` field")]
    MissingData,
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => Self::Status(code),
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Anything that can produce a fresh [`MetricsSnapshot`].
///
/// Implementations must be shareable across threads: detached refreshes
/// call `fetch` from a background thread.
pub trait MetricsSource: Send + Sync {
    /// Perform one fetch.
    fn fetch(&self) -> Result<MetricsSnapshot, FetchError>;

    /// Human-readable description of where snapshots come from.
    fn describe(&self) -> String {
        "metrics source".to_string()
    }
}

/// Decode a raw response body into a snapshot.
pub fn decode_body(body: &str) -> Result<MetricsSnapshot, FetchError> {
    let envelope =
        MetricsEnvelope::from_json(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    envelope.into_snapshot().ok_or(FetchError::MissingData)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the metrics endpoint.
#[derive(Debug, Clone)]
pub struct HttpMetricsClient {
    url: String,
    timeout: Duration,
}

impl HttpMetricsClient {
    /// Build a client from the resolved endpoint config.
    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(&config.base_url, &config.path, Duration::from_millis(config.timeout_ms))
    }

    /// Build a client for `base_url` joined with `path`.
    ///
    /// `localhost` is rewritten to `127.0.0.1` so an IPv6-first resolver
    /// does not stall against a server bound to IPv4 only.
    pub fn new(base_url: &str, path: &str, timeout: Duration) -> Self {
        let url = join_url(base_url, path).replace("://localhost", "://127.0.0.1");
        Self { url, timeout }
    }

    /// Full URL this client fetches.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl MetricsSource for HttpMetricsClient {
    fn fetch(&self) -> Result<MetricsSnapshot, FetchError> {
        debug!(url = %self.url, "fetching metrics");

        let resp = ureq::get(&self.url).timeout(self.timeout).call()?;
        let body = resp
            .into_string()
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        decode_body(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Join a base URL and a path with exactly one `/` between them.
fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let client = HttpMetricsClient::from_config(&EndpointConfig::default());
        assert_eq!(client.url(), "http://127.0.0.1:5000/api/metrics");
        assert_eq!(client.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn client_rewrites_localhost() {
        let client = HttpMetricsClient::new(
            "http://localhost:8080",
            "/api/metrics",
            Duration::from_secs(1),
        );
        assert_eq!(client.url(), "http://127.0.0.1:8080/api/metrics");
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h/", "/api/metrics"), "http://h/api/metrics");
        assert_eq!(join_url("http://h", "api/metrics"), "http://h/api/metrics");
        assert_eq!(join_url("http://h//", ""), "http://h");
    }

    #[test]
    fn decode_body_variants() {
        let snap = decode_body(r#"{"data": {"cache_hits": 1, "cache_misses": 2}}"#).unwrap();
        assert_eq!(snap.hit_rate(), 33);

        assert_eq!(decode_body(r#"{"ok": true}"#), Err(FetchError::MissingData));
        assert!(matches!(decode_body("not json"), Err(FetchError::Decode(_))));
        assert!(matches!(decode_body(r#"{"data": 5}"#), Err(FetchError::Decode(_))));
    }

    #[test]
    fn decode_body_keeps_good_counters_next_to_a_bad_one() {
        let snap =
            decode_body(r#"{"data":{"case_count":12,"uploaded_files":8,"vector_docs":-3}}"#)
                .unwrap();
        assert_eq!(snap.case_count, 12);
        assert_eq!(snap.uploaded_files, 8);
        assert_eq!(snap.vector_docs, 0);
    }

    #[test]
    fn fetch_error_messages() {
        assert_eq!(FetchError::Status(503).to_string(), "endpoint returned HTTP 503");
        assert_eq!(
            FetchError::MissingData.to_string(),
            "metrics payload has no `data` field"
        );
    }
}
