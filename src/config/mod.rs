/// Configuration system for metricsview.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — [`schema::MetricsViewConfig::default()`]
/// 2. **User global config** — `~/.metricsview/config.toml`
/// 3. **Project local config** — `.metricsview.toml` in the current directory
/// 4. **Environment variables** — `METRICSVIEW_*` overrides (highest precedence)
///
/// A config file that is missing or malformed is skipped and the previous
/// layer stays in effect.
///
/// # Usage
///
/// ```rust,ignore
/// use metricsview::config;
///
/// let cfg = config::load();
/// let client = HttpMetricsClient::from_config(&cfg.endpoint);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub use schema::MetricsViewConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars.
pub fn load() -> MetricsViewConfig {
    let mut config = load_files(global_config_path(), project_config_path());
    apply_env_overrides(&mut config);
    config
}

/// Merge the file layers only (no environment overrides).
///
/// Layers are merged key by key, so a project file that sets only
/// `display.layout` keeps the endpoint from the global file.
pub fn load_files(global: Option<PathBuf>, project: Option<PathBuf>) -> MetricsViewConfig {
    let mut merged = toml::Value::Table(toml::Table::new());

    for layer in [global, project].into_iter().filter_map(load_toml_file) {
        merge_toml(&mut merged, layer);
    }

    match merged.try_into() {
        Ok(config) => config,
        Err(e) => {
            debug!(error = %e, "merged config invalid, using defaults");
            MetricsViewConfig::default()
        }
    }
}

/// Load a TOML config file from the given path (if it exists).
///
/// The file must deserialize as a config on its own; otherwise the whole
/// layer is skipped.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let checked = toml::from_str::<toml::Value>(&content)
        .and_then(|value| value.clone().try_into::<MetricsViewConfig>().map(|_| value));
    match checked {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Tables merge per key; any other
/// value in the overlay replaces the base value.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.metricsview/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".metricsview").join("config.toml"))
}

/// Path to the project local config: `.metricsview.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".metricsview.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `METRICSVIEW_URL` — endpoint base URL
/// - `METRICSVIEW_PATH` — endpoint path
/// - `METRICSVIEW_TIMEOUT_MS` — request timeout
/// - `METRICSVIEW_LAYOUT` — `overview` or `stats`
/// - `METRICSVIEW_COLOR` — colored output (`1`/`true`/`yes`/`on`)
/// - `METRICSVIEW_FETCH_LOG` — fetch log enabled
pub fn apply_env_overrides(config: &mut MetricsViewConfig) {
    if let Ok(val) = std::env::var("METRICSVIEW_URL")
        && !val.is_empty()
    {
        config.endpoint.base_url = val;
    }
    if let Ok(val) = std::env::var("METRICSVIEW_PATH")
        && !val.is_empty()
    {
        config.endpoint.path = val;
    }
    if let Ok(val) = std::env::var("METRICSVIEW_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.endpoint.timeout_ms = ms;
    }

    if let Ok(val) = std::env::var("METRICSVIEW_LAYOUT")
        && let Ok(layout) = val.parse::<schema::Layout>()
    {
        config.display.layout = layout;
    }
    if let Ok(val) = std::env::var("METRICSVIEW_COLOR") {
        config.display.color = is_truthy(&val);
    }

    if let Ok(val) = std::env::var("METRICSVIEW_FETCH_LOG") {
        config.logging.fetch_log = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.metricsview/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write the default annotated config to `path`.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, MetricsViewConfig::default_toml()).context("failed to write config file")?;

    Ok(())
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `endpoint.timeout_ms`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

/// Set a single config key in the file at `path`.
///
/// Starts from the serialized defaults when the file does not exist yet.
/// The result must still deserialize as a valid config, so a bad layout name
/// or a string where a number belongs is rejected before anything is written.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&MetricsViewConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;

    set_toml_value(&mut value_table, key, value)?;

    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    let _: MetricsViewConfig = toml::from_str(&output)
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    if key.is_empty() {
        anyhow::bail!("empty config key");
    }
    let (sections, leaf) = key.rsplit_once('.').unwrap_or(("", key));

    let mut current = root;
    for part in sections.split('.').filter(|p| !p.is_empty()) {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{sections}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
