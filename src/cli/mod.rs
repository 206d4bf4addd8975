//! CLI command implementations for metricsview.
//!
//! Provides subcommand handlers for:
//! - `metricsview show` — fetch once and print a panel
//! - `metricsview watch` — print a panel and refresh on Enter (or a timer)
//! - `metricsview health` — check config, endpoint, fetch log
//! - `metricsview history` — recent fetches from the fetch log
//! - `metricsview config show|init|set|reset` — configuration management

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::logger::{self, FetchLogEntry};
use crate::analytics::reporter::{self, FetchSummary};
use crate::client::logged::LoggedSource;
use crate::client::{HttpMetricsClient, MetricsSource};
use crate::config::{self, MetricsViewConfig, schema::Layout};
use crate::render::{OutputFormat, renderer_for};
use crate::view::MetricsView;

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Build the metrics source described by the config.
fn build_source(cfg: &MetricsViewConfig) -> Arc<dyn MetricsSource> {
    let http = HttpMetricsClient::from_config(&cfg.endpoint);
    if cfg.logging.fetch_log
        && let Some(logged) = LoggedSource::with_default_log(http.clone())
    {
        return Arc::new(logged);
    }
    Arc::new(http)
}

fn apply_color(cfg: &MetricsViewConfig) {
    if !cfg.display.color {
        colored::control::set_override(false);
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .context("failed writing to stdout")
}

// ---------------------------------------------------------------------------
// metricsview show
// ---------------------------------------------------------------------------

/// Fetch once and print the panel.
pub fn run_show(layout: Option<Layout>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    apply_color(&cfg);

    let layout = layout.unwrap_or(cfg.display.layout);
    let view = MetricsView::initialize(build_source(&cfg));
    let renderer = renderer_for(layout, format);

    write_stdout(&view.render(renderer.as_ref()))
}

// ---------------------------------------------------------------------------
// metricsview watch
// ---------------------------------------------------------------------------

enum WatchEvent {
    Refresh,
    Applied,
    Quit,
}

/// Print the panel, then refresh on every Enter keypress until `q` or EOF.
///
/// Refreshes run detached: the panel is reprinted whenever a fetch lands,
/// so overlapping refreshes show up in the order their responses arrive.
/// With `interval`, a refresh is also issued whenever that much time passes
/// without input.
pub fn run_watch(layout: Option<Layout>, interval: Option<Duration>) -> Result<()> {
    let cfg = config::load();
    apply_color(&cfg);

    let layout = layout.unwrap_or(cfg.display.layout);
    let renderer = renderer_for(layout, OutputFormat::Table);
    let view = MetricsView::initialize(build_source(&cfg));

    write_stdout(&view.render(renderer.as_ref()))?;
    print_watch_hint()?;

    let (tx, rx) = mpsc::channel();
    let input_tx = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let event = if line.trim().eq_ignore_ascii_case("q") {
                WatchEvent::Quit
            } else {
                WatchEvent::Refresh
            };
            let quit = matches!(event, WatchEvent::Quit);
            if input_tx.send(event).is_err() || quit {
                return;
            }
        }
        let _ = input_tx.send(WatchEvent::Quit);
    });

    loop {
        let event = match interval {
            Some(every) => match rx.recv_timeout(every) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => WatchEvent::Refresh,
                Err(RecvTimeoutError::Disconnected) => WatchEvent::Quit,
            },
            None => rx.recv().unwrap_or(WatchEvent::Quit),
        };

        match event {
            WatchEvent::Refresh => {
                let handle = view.refresh_detached();
                let applied_tx = tx.clone();
                thread::spawn(move || {
                    let _ = handle.join();
                    let _ = applied_tx.send(WatchEvent::Applied);
                });
            }
            WatchEvent::Applied => {
                write_stdout(&view.render(renderer.as_ref()))?;
                print_watch_hint()?;
            }
            WatchEvent::Quit => break,
        }
    }

    Ok(())
}

fn print_watch_hint() -> Result<()> {
    write_stdout(&format!(
        "  {}\n",
        "Enter: refresh  ·  q: quit".dimmed()
    ))
}

// ---------------------------------------------------------------------------
// metricsview health
// ---------------------------------------------------------------------------

/// Check config files, endpoint reachability and the fetch log.
pub fn run_health() -> Result<()> {
    let cfg = config::load();
    apply_color(&cfg);

    println!("{}", "metricsview Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.metricsview/config.toml found"
        } else {
            "not found (run `metricsview config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".metricsview.toml found"
        } else {
            "none (optional)"
        },
    );

    // Probe the endpoint directly so the health check itself is not logged.
    let client = HttpMetricsClient::from_config(&cfg.endpoint);
    let start = Instant::now();
    let probe = client.fetch();
    let latency_ms = start.elapsed().as_millis();
    match &probe {
        Ok(snapshot) => print_health_item(
            "Metrics endpoint",
            true,
            &format!(
                "{} ({} ms, cache hit {}%)",
                client.url(),
                latency_ms,
                snapshot.hit_rate()
            ),
        ),
        Err(e) => print_health_item("Metrics endpoint", false, &format!("{}: {e}", client.url())),
    }

    let log_path = logger::fetch_log_path();
    let log_exists = log_path.as_ref().map(|p| p.exists()).unwrap_or(false);
    let detail = if !cfg.logging.fetch_log {
        "disabled (logging.fetch_log = false)".to_string()
    } else if log_exists {
        format!("{} entries", logger::read_all_entries().len())
    } else {
        "no log file yet".to_string()
    };
    print_health_item("Fetch log", log_exists, &detail);

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// metricsview history
// ---------------------------------------------------------------------------

/// Show recent fetches and an overall summary from the fetch log.
pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    apply_color(&cfg);

    let entries = logger::read_all_entries();
    if entries.is_empty() {
        println!(
            "{}",
            "No fetches recorded yet. Run `metricsview show` to fetch metrics.".yellow()
        );
        return Ok(());
    }

    let summary = reporter::summarize(&entries);
    let recent = logger::recent_entries(entries, limit);

    match format {
        OutputFormat::Json => print_history_json(&summary, &recent)?,
        OutputFormat::Csv => print_history_csv(&recent),
        OutputFormat::Table => print_history_table(&summary, &recent),
    }

    Ok(())
}

fn print_history_table(summary: &FetchSummary, recent: &[FetchLogEntry]) {
    println!("{}", "metricsview Fetch History".bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Fetches:     ".bold(), summary.total);
    println!(
        "  {} {:.1}% ({} failed)",
        "Success rate:".bold(),
        summary.success_pct(),
        summary.failures
    );
    println!(
        "  {} {} ms avg, {} ms max",
        "Latency:     ".bold(),
        summary.avg_latency_ms,
        summary.max_latency_ms
    );
    if let Some(ref err) = summary.last_error {
        println!("  {} {}", "Last error:  ".bold(), err.yellow());
    }
    println!();

    println!(
        "  {:<26} {:>8} {:>7} Result",
        "Time", "Latency", "Hit %"
    );
    println!("  {}", "-".repeat(58));
    for entry in recent {
        let hit = entry
            .hit_rate
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".to_string());
        let result = if entry.success {
            "ok".green()
        } else {
            entry.error.as_deref().unwrap_or("failed").red()
        };
        println!(
            "  {:<26} {:>6}ms {:>7} {}",
            truncate(&entry.timestamp, 26),
            entry.latency_ms,
            hit,
            result
        );
    }
}

fn print_history_json(summary: &FetchSummary, recent: &[FetchLogEntry]) -> Result<()> {
    let value = serde_json::json!({
        "total": summary.total,
        "successes": summary.successes,
        "failures": summary.failures,
        "success_pct": summary.success_pct(),
        "avg_latency_ms": summary.avg_latency_ms,
        "max_latency_ms": summary.max_latency_ms,
        "last_success": summary.last_success,
        "last_error": summary.last_error,
        "recent": recent,
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_history_csv(recent: &[FetchLogEntry]) {
    println!("timestamp,url,success,latency_ms,hit_rate,error");
    for e in recent {
        println!(
            "{},{},{},{},{},{}",
            e.timestamp,
            e.url,
            e.success,
            e.latency_ms,
            e.hit_rate.map(|h| h.to_string()).unwrap_or_default(),
            e.error.as_deref().unwrap_or("").replace(',', ";"),
        );
    }
}

// ---------------------------------------------------------------------------
// metricsview config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective metricsview Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.metricsview/config.toml", global_exists);
    print_source(".metricsview.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "METRICSVIEW_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.metricsview/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
