/// Dashboard counters and the derived cache hit rate.
///
/// The metrics endpoint answers with an envelope of the form
/// `{ "data": { "case_count": 12, ... } }`. Every counter is optional on the
/// wire; a missing or `null` counter reads as zero, and so does a counter
/// that is not a non-negative whole number (`-1`, `2.5`, `"12"`). One bad
/// counter never discards the others. A payload whose `data` field is absent
/// (or `null`) carries no snapshot at all.
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One complete set of counters as returned by a single fetch.
///
/// Snapshots are never merged: each fetch produces a fresh value that
/// replaces the previous one wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub case_count: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub uploaded_files: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub task_count: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub vector_docs: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub graph_nodes: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cache_hits: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cache_misses: u64,
}

impl MetricsSnapshot {
    /// Cache hit rate as an integer percentage.
    pub fn hit_rate(&self) -> u8 {
        hit_rate(self.cache_hits, self.cache_misses)
    }
}

/// Read one counter, falling back to 0 for anything that is not a
/// non-negative whole number. `3.0` is accepted as 3.
fn zero_if_null<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(counter_value(&value))
}

fn counter_value(value: &serde_json::Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return n;
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => f as u64,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// Response body of `GET /api/metrics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsEnvelope {
    #[serde(default)]
    pub data: Option<MetricsSnapshot>,
}

impl MetricsEnvelope {
    /// Parse an envelope from raw JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// The snapshot carried by this envelope, if any.
    pub fn into_snapshot(self) -> Option<MetricsSnapshot> {
        self.data
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Percentage of cache lookups that were hits, rounded half up.
///
/// Returns 0 when there were no lookups. Computed in integer arithmetic as
/// `floor((200h + t) / 2t)`, which equals `round(100h / t)` with halves
/// rounded up, so no floating-point error can creep in at the boundaries.
pub fn hit_rate(hits: u64, misses: u64) -> u8 {
    let hits = u128::from(hits);
    let total = hits + u128::from(misses);
    if total == 0 {
        return 0;
    }
    // hits <= total, so the quotient is at most 100
    ((200 * hits + total) / (2 * total)) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_zero_when_no_lookups() {
        assert_eq!(hit_rate(0, 0), 0);
    }

    #[test]
    fn hit_rate_reference_values() {
        assert_eq!(hit_rate(3, 1), 75);
        assert_eq!(hit_rate(1, 1), 50);
        assert_eq!(hit_rate(1, 2), 33);
        assert_eq!(hit_rate(2, 1), 67);
        assert_eq!(hit_rate(0, 9), 0);
        assert_eq!(hit_rate(9, 0), 100);
    }

    #[test]
    fn hit_rate_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(hit_rate(1, 7), 13);
        // 7/8 = 87.5%
        assert_eq!(hit_rate(7, 1), 88);
        // 1/200 = 0.5%
        assert_eq!(hit_rate(1, 199), 1);
    }

    #[test]
    fn hit_rate_matches_float_rounding_on_small_inputs() {
        for h in 0..60u64 {
            for m in 0..60u64 {
                let total = h + m;
                let expected = if total == 0 {
                    0
                } else {
                    (h as f64 * 100.0 / total as f64).round() as u8
                };
                assert_eq!(hit_rate(h, m), expected, "h={h} m={m}");
                assert!(hit_rate(h, m) <= 100);
            }
        }
    }

    #[test]
    fn hit_rate_does_not_overflow_at_extremes() {
        assert_eq!(hit_rate(u64::MAX, 0), 100);
        assert_eq!(hit_rate(u64::MAX, u64::MAX), 50);
        assert_eq!(hit_rate(0, u64::MAX), 0);
    }

    #[test]
    fn snapshot_missing_fields_read_as_zero() {
        let snap: MetricsSnapshot = serde_json::from_str(r#"{"case_count": 4}"#).unwrap();
        assert_eq!(snap.case_count, 4);
        assert_eq!(snap.uploaded_files, 0);
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.hit_rate(), 0);
    }

    #[test]
    fn snapshot_null_fields_read_as_zero() {
        let snap: MetricsSnapshot =
            serde_json::from_str(r#"{"cache_hits": null, "cache_misses": 2}"#).unwrap();
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.cache_misses, 2);
    }

    #[test]
    fn snapshot_ignores_unknown_fields() {
        let snap: MetricsSnapshot =
            serde_json::from_str(r#"{"graph_nodes": 7, "uptime_secs": 99}"#).unwrap();
        assert_eq!(snap.graph_nodes, 7);
    }

    #[test]
    fn envelope_with_data() {
        let env = MetricsEnvelope::from_json(
            r#"{"data": {"cache_hits": 3, "cache_misses": 1, "task_count": 2}}"#,
        )
        .unwrap();
        let snap = env.into_snapshot().unwrap();
        assert_eq!(snap.task_count, 2);
        assert_eq!(snap.hit_rate(), 75);
    }

    #[test]
    fn envelope_without_data_has_no_snapshot() {
        let env = MetricsEnvelope::from_json(r#"{"status": "ok"}"#).unwrap();
        assert!(env.into_snapshot().is_none());

        let env = MetricsEnvelope::from_json(r#"{"data": null}"#).unwrap();
        assert!(env.into_snapshot().is_none());
    }

    #[test]
    fn envelope_with_empty_data_is_all_zero() {
        let env = MetricsEnvelope::from_json(r#"{"data": {}}"#).unwrap();
        assert_eq!(env.into_snapshot(), Some(MetricsSnapshot::default()));
    }

    #[test]
    fn snapshot_bad_counter_reads_as_zero_and_keeps_the_rest() {
        let snap: MetricsSnapshot = serde_json::from_str(
            r#"{"case_count": 12, "uploaded_files": 8, "vector_docs": 2.5,
                "task_count": "12", "graph_nodes": -1, "cache_hits": [1],
                "cache_misses": {"n": 1}}"#,
        )
        .unwrap();
        assert_eq!(snap.case_count, 12);
        assert_eq!(snap.uploaded_files, 8);
        assert_eq!(snap.vector_docs, 0);
        assert_eq!(snap.task_count, 0);
        assert_eq!(snap.graph_nodes, 0);
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.cache_misses, 0);
    }

    #[test]
    fn snapshot_whole_float_counter_is_accepted() {
        let snap: MetricsSnapshot =
            serde_json::from_str(r#"{"vector_docs": 3.0, "cache_hits": 1e2}"#).unwrap();
        assert_eq!(snap.vector_docs, 3);
        assert_eq!(snap.cache_hits, 100);
    }
}
