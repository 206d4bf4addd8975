//! Fetch-log reporter — aggregation for `metricsview history`.
//!
//! Reads the JSONL fetch log and summarizes how the metrics endpoint has
//! behaved: success rate, latency, and the most recent failure.

use crate::analytics::logger::FetchLogEntry;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Aggregate view over a set of fetch log entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Timestamp of the newest successful fetch.
    pub last_success: Option<String>,
    /// Error message of the newest failed fetch.
    pub last_error: Option<String>,
}

impl FetchSummary {
    /// Percentage of fetches that succeeded, 0.0 when there are none.
    pub fn success_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total as f64) * 100.0
        }
    }
}

/// Summarize the given entries (assumed oldest first).
pub fn summarize(entries: &[FetchLogEntry]) -> FetchSummary {
    if entries.is_empty() {
        return FetchSummary::default();
    }

    let total = entries.len();
    let successes = entries.iter().filter(|e| e.success).count();
    let latency_sum: u64 = entries.iter().map(|e| e.latency_ms).sum();
    let max_latency_ms = entries.iter().map(|e| e.latency_ms).max().unwrap_or(0);

    let last_success = entries
        .iter()
        .rev()
        .find(|e| e.success)
        .map(|e| e.timestamp.clone());
    let last_error = entries
        .iter()
        .rev()
        .find(|e| !e.success)
        .and_then(|e| e.error.clone());

    FetchSummary {
        total,
        successes,
        failures: total - successes,
        avg_latency_ms: latency_sum / total as u64,
        max_latency_ms,
        last_success,
        last_error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
