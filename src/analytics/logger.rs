use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::client::FetchError;
use crate::metrics::MetricsSnapshot;

// ---------------------------------------------------------------------------
// Fetch log entry (JSONL)
// ---------------------------------------------------------------------------

/// A single entry in the fetch log (`~/.metricsview/fetch-log.jsonl`).
///
/// One entry is written per completed fetch, successful or not. Read back by
/// the reporter for `metricsview history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    pub url: String,
    pub success: bool,
    pub latency_ms: u64,
    /// Failure cause, only set when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    /// Cache hit rate of the fetched snapshot, only set on success.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hit_rate: Option<u8>,
}

impl FetchLogEntry {
    /// Build an entry stamped with the current time from a fetch outcome.
    pub fn from_outcome(
        url: &str,
        outcome: &Result<MetricsSnapshot, FetchError>,
        latency_ms: u64,
    ) -> Self {
        let (success, error, hit_rate) = match outcome {
            Ok(snapshot) => (true, None, Some(snapshot.hit_rate())),
            Err(err) => (false, Some(err.to_string()), None),
        };

        Self {
            timestamp: Utc::now().to_rfc3339(),
            url: url.to_string(),
            success,
            latency_ms,
            error,
            hit_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry to the log at `path`, creating parent directories.
pub fn append_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read all entries from the default fetch log.
pub fn read_all_entries() -> Vec<FetchLogEntry> {
    match fetch_log_path() {
        Some(path) => read_entries(&path),
        None => Vec::new(),
    }
}

/// Read all entries from the log at `path`.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_entries(path: &Path) -> Vec<FetchLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
        .collect()
}

/// The most recent `limit` entries, oldest first.
pub fn recent_entries(entries: Vec<FetchLogEntry>, limit: usize) -> Vec<FetchLogEntry> {
    let skip = entries.len().saturating_sub(limit);
    entries.into_iter().skip(skip).collect()
}

/// Return the path to the fetch log file.
pub fn fetch_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".metricsview").join("fetch-log.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_log(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "metricsview-logger-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("fetch-log.jsonl")
    }

    #[test]
    fn entry_from_success() {
        let snap = MetricsSnapshot {
            cache_hits: 3,
            cache_misses: 1,
            ..Default::default()
        };
        let entry = FetchLogEntry::from_outcome("http://h/api/metrics", &Ok(snap), 12);
        assert!(entry.success);
        assert_eq!(entry.hit_rate, Some(75));
        assert!(entry.error.is_none());
        assert_eq!(entry.latency_ms, 12);
    }

    #[test]
    fn entry_from_failure() {
        let entry = FetchLogEntry::from_outcome("u", &Err(FetchError::Status(500)), 3);
        assert!(!entry.success);
        assert_eq!(entry.error.as_deref(), Some("endpoint returned HTTP 500"));
        assert!(entry.hit_rate.is_none());
    }

    #[test]
    fn append_then_read_skips_malformed_lines() {
        let path = scratch_log("append");
        let ok = FetchLogEntry::from_outcome("u", &Ok(MetricsSnapshot::default()), 1);
        append_entry(&path, &ok).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();
        let failed = FetchLogEntry::from_outcome("u", &Err(FetchError::MissingData), 2);
        append_entry(&path, &failed).unwrap();

        let entries = read_entries(&path);
        assert_eq!(entries, vec![ok, failed]);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn read_missing_file_is_empty() {
        let path = scratch_log("missing");
        assert!(read_entries(&path).is_empty());
    }

    #[test]
    fn recent_entries_keeps_tail() {
        let entries: Vec<_> = (0..5)
            .map(|i| FetchLogEntry::from_outcome("u", &Err(FetchError::MissingData), i))
            .collect();
        let tail = recent_entries(entries, 2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].latency_ms, 3);
        assert_eq!(tail[1].latency_ms, 4);

        assert!(recent_entries(Vec::new(), 3).is_empty());
    }
}
