use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use metricsview::cli;
use metricsview::config::schema::Layout;
use metricsview::render::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "metricsview")]
#[command(about = "Dashboard metrics in the terminal: cases, files, tasks, vectors, graph, cache")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch metrics once and print a panel
    Show {
        /// Panel layout: overview (grid) or stats (list). Defaults to config.
        #[arg(long)]
        layout: Option<Layout>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Print a panel and refresh it on Enter (q to quit)
    Watch {
        /// Panel layout: overview (grid) or stats (list). Defaults to config.
        #[arg(long)]
        layout: Option<Layout>,
        /// Also refresh automatically after N idle seconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Check config files, endpoint reachability and the fetch log
    Health,
    /// Show recent fetches recorded in the fetch log
    History {
        /// Number of recent fetches to list
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.metricsview/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `endpoint.base_url http://host:5000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    init_tracing();
    let app = App::parse();

    match app.command {
        Commands::Show { layout, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_show(layout, fmt)
        }
        Commands::Watch { layout, interval } => {
            let interval = interval.filter(|&s| s > 0).map(Duration::from_secs);
            cli::run_watch(layout, interval)
        }
        Commands::Health => cli::run_health(),
        Commands::History { limit, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_history(limit, fmt)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

/// Diagnostics go to stderr, filtered by `METRICSVIEW_LOG` (default `warn`).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("METRICSVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
