/// Configuration schema and defaults for metricsview.
///
/// Defines the TOML-serializable configuration structure with sections
/// `[endpoint]`, `[display]`, and `[logging]`. Every field has a built-in
/// default; users only set the values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level metricsview configuration.
///
/// Maps directly to `~/.metricsview/config.toml` and `.metricsview.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsViewConfig {
    pub endpoint: EndpointConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [endpoint]
// ---------------------------------------------------------------------------

/// Where metrics are fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Scheme, host and port of the dashboard backend.
    pub base_url: String,
    /// Path of the metrics endpoint.
    pub path: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            path: "/api/metrics".to_string(),
            timeout_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// [display]
// ---------------------------------------------------------------------------

/// Panel layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Grid of cards.
    #[default]
    Overview,
    /// One counter per line.
    Stats,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overview => write!(f, "overview"),
            Self::Stats => write!(f, "stats"),
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overview" | "grid" => Ok(Self::Overview),
            "stats" | "list" => Ok(Self::Stats),
            other => Err(format!("unknown layout '{other}' (expected overview or stats)")),
        }
    }
}

/// Terminal display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Default layout when `--layout` is not given.
    pub layout: Layout,
    /// Colored output.
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            color: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch-log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append every fetch outcome to `~/.metricsview/fetch-log.jsonl`.
    pub fetch_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { fetch_log: true }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl MetricsViewConfig {
    /// The annotated default config written by `metricsview config init`.
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG_TOML
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# metricsview configuration
#
# Precedence (lowest to highest): built-in defaults, this file,
# ./.metricsview.toml, METRICSVIEW_* environment variables.

[endpoint]
# Dashboard backend serving the metrics endpoint.
base_url = "http://127.0.0.1:5000"
path = "/api/metrics"
timeout_ms = 5000

[display]
# "overview" (grid of cards) or "stats" (list)
layout = "overview"
color = true

[logging]
# Record each fetch in ~/.metricsview/fetch-log.jsonl
fetch_log = true
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
