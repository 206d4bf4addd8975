//! Layout strategies for a [`MetricsView`](crate::view::MetricsView).
//!
//! The view owns data and refresh; a [`Renderer`] only decides how the seven
//! counters and the hit rate are laid out:
//!
//! - [`GridRenderer`] — the "Overview" panel, a grid of labelled cards
//! - [`ListRenderer`] — the "Stats" panel, one counter per line
//! - [`JsonRenderer`] / [`CsvRenderer`] — machine-readable output

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::config::schema::Layout;
use crate::metrics::MetricsSnapshot;
use crate::view::ViewState;

// ---------------------------------------------------------------------------
// Model and trait
// ---------------------------------------------------------------------------

/// Everything a renderer may display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderModel {
    pub snapshot: MetricsSnapshot,
    pub hit_rate: u8,
    pub loaded: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RenderModel {
    pub fn from_state(state: &ViewState) -> Self {
        let snapshot = state.snapshot();
        let fetched_at = match state {
            ViewState::Loaded { fetched_at, .. } => Some(*fetched_at),
            ViewState::Empty => None,
        };
        Self {
            snapshot,
            hit_rate: snapshot.hit_rate(),
            loaded: state.is_loaded(),
            fetched_at,
        }
    }
}

/// How a view lays out its numbers.
pub trait Renderer {
    fn render(&self, model: &RenderModel) -> String;
}

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Pick the renderer for a layout and output format.
pub fn renderer_for(layout: Layout, format: OutputFormat) -> Box<dyn Renderer> {
    match (format, layout) {
        (OutputFormat::Json, _) => Box::new(JsonRenderer { layout }),
        (OutputFormat::Csv, _) => Box::new(CsvRenderer),
        (OutputFormat::Table, Layout::Overview) => Box::new(GridRenderer::default()),
        (OutputFormat::Table, Layout::Stats) => Box::new(ListRenderer),
    }
}

// ---------------------------------------------------------------------------
// Overview: grid of cards
// ---------------------------------------------------------------------------

/// The "Overview" panel: six cards laid out `columns` per row.
#[derive(Debug, Clone, Copy)]
pub struct GridRenderer {
    pub columns: usize,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self { columns: 3 }
    }
}

const CARD_WIDTH: usize = 16;

impl GridRenderer {
    fn cards(model: &RenderModel) -> [(&'static str, String); 6] {
        let s = &model.snapshot;
        [
            ("Cases", format_number(s.case_count)),
            ("Files", format_number(s.uploaded_files)),
            ("Tasks", format_number(s.task_count)),
            ("Vectors", format_number(s.vector_docs)),
            ("Graph", format_number(s.graph_nodes)),
            ("Cache Hit %", model.hit_rate.to_string()),
        ]
    }
}

impl Renderer for GridRenderer {
    fn render(&self, model: &RenderModel) -> String {
        let columns = self.columns.max(1);
        let mut out = String::new();

        out.push_str(&format!("{}\n", "Overview".bold().cyan()));
        out.push_str(&format!("{}\n", "=".repeat(CARD_WIDTH * columns + 2)));

        for row in Self::cards(model).chunks(columns) {
            let labels: String = row
                .iter()
                .map(|(label, _)| format!("{label:<CARD_WIDTH$}"))
                .collect();
            let values: String = row
                .iter()
                .map(|(_, value)| format!("{value:<CARD_WIDTH$}"))
                .collect();
            out.push_str(&format!("  {}\n", labels.trim_end().dimmed()));
            out.push_str(&format!("  {}\n", values.trim_end().bold()));
        }

        out.push_str(&footer(model));
        out
    }
}

// ---------------------------------------------------------------------------
// Stats: list
// ---------------------------------------------------------------------------

/// The "Stats" panel: one labelled counter per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRenderer;

impl ListRenderer {
    fn rows(model: &RenderModel) -> [(&'static str, String); 8] {
        let s = &model.snapshot;
        [
            ("Cases", format_number(s.case_count)),
            ("Uploaded files", format_number(s.uploaded_files)),
            ("Vector documents", format_number(s.vector_docs)),
            ("Graph nodes", format_number(s.graph_nodes)),
            ("Cache hits", format_number(s.cache_hits)),
            ("Cache misses", format_number(s.cache_misses)),
            ("Cache hit %", model.hit_rate.to_string()),
            ("Tasks", format_number(s.task_count)),
        ]
    }
}

impl Renderer for ListRenderer {
    fn render(&self, model: &RenderModel) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "Stats".bold().cyan()));
        out.push_str(&format!("{}\n", "=".repeat(40)));

        for (label, value) in Self::rows(model) {
            let label = format!("{label}:");
            out.push_str(&format!("  {} {}\n", format!("{label:<18}").bold(), value));
        }

        out.push_str(&footer(model));
        out
    }
}

/// Shared status line under the table layouts.
fn footer(model: &RenderModel) -> String {
    match model.fetched_at {
        Some(at) => format!(
            "  {}\n",
            format!("updated {}", at.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
        ),
        None => format!("  {}\n", "no data (endpoint unavailable or empty)".yellow()),
    }
}

// ---------------------------------------------------------------------------
// Machine-readable
// ---------------------------------------------------------------------------

/// Pretty-printed JSON object with the raw counters and the hit rate.
#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer {
    pub layout: Layout,
}

impl Renderer for JsonRenderer {
    fn render(&self, model: &RenderModel) -> String {
        let value = serde_json::json!({
            "view": self.layout.to_string(),
            "state": if model.loaded { "loaded" } else { "empty" },
            "fetched_at": model.fetched_at.map(|t| t.to_rfc3339()),
            "metrics": model.snapshot,
            "cache_hit_rate": model.hit_rate,
        });
        // Serializing a json! value cannot fail.
        let mut text = serde_json::to_string_pretty(&value).unwrap_or_default();
        text.push('\n');
        text
    }
}

/// `metric,value` rows, hit rate last.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl Renderer for CsvRenderer {
    fn render(&self, model: &RenderModel) -> String {
        let s = &model.snapshot;
        let rows: [(&str, u64); 8] = [
            ("case_count", s.case_count),
            ("uploaded_files", s.uploaded_files),
            ("task_count", s.task_count),
            ("vector_docs", s.vector_docs),
            ("graph_nodes", s.graph_nodes),
            ("cache_hits", s.cache_hits),
            ("cache_misses", s.cache_misses),
            ("cache_hit_rate", u64::from(model.hit_rate)),
        ];

        let mut out = String::from("metric,value\n");
        for (name, value) in rows {
            out.push_str(&format!("{name},{value}\n"));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
