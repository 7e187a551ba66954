//! rwa-watch main entry point
//!
//! This is the command-line interface for the rwa-watch listing monitor.

use anyhow::Context;
use clap::Parser;
use rwa_watch::batch::{
    select_sources, watch_interrupts, BatchSettings, Orchestrator, Selection, SourceSelection,
};
use rwa_watch::config::{apply_env_overrides, load_config_with_hash, validate, Config};
use rwa_watch::run::{format_duration, print_batch_summary};
use rwa_watch::session::BrowserLauncher;
use rwa_watch::source::SourceKind;
use rwa_watch::store::{open_store, RecordStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// rwa-watch: new-listing monitor for tokenized real-estate marketplaces
///
/// rwa-watch visits each configured marketplace, collects every listing into a
/// dated snapshot, and reports which listings appeared since the previous run.
#[derive(Parser, Debug)]
#[command(name = "rwa-watch")]
#[command(version)]
#[command(about = "Listing acquisition and change detection for RWA marketplaces", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Run only the named source (repeatable)
    #[arg(short, long = "source", value_name = "NAME", conflicts_with = "include")]
    sources: Vec<String>,

    /// Add an opt-in source to a full run (repeatable)
    #[arg(long, value_name = "NAME")]
    include: Vec<String>,

    /// Keep running on a fixed interval until interrupted
    #[arg(long)]
    schedule: bool,

    /// Hours between scheduled batches (overrides config and environment)
    #[arg(long, value_name = "N", requires = "schedule")]
    interval_hours: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show which sources would run without opening a session
    #[arg(long, conflicts_with_all = ["status", "schedule"])]
    dry_run: bool,

    /// Show the latest snapshot and history size per source and exit
    #[arg(long, conflicts_with_all = ["dry_run", "schedule"])]
    status: bool,
}

impl Cli {
    fn selection(&self) -> Selection {
        if self.sources.is_empty() {
            Selection::All {
                include: self.include.clone(),
            }
        } else {
            Selection::Named(self.sources.clone())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(&cli)?;
    let selection = select_sources(&config, &cli.selection())
        .context("Failed to resolve sources")?;

    if cli.dry_run {
        handle_dry_run(&config, &selection);
        return Ok(());
    }

    if cli.status {
        return handle_status(&config);
    }

    if selection.plans.is_empty() {
        anyhow::bail!("No sources selected");
    }

    let launcher = Arc::new(BrowserLauncher::new(config.session.clone()));
    let store = Arc::new(open_store(&config.output));
    let orchestrator = Orchestrator::new(launcher, store, BatchSettings::from_config(&config));

    if cli.schedule {
        handle_schedule(&orchestrator, &selection, config.run.interval()).await;
    } else {
        let report = orchestrator.run_selection(&selection).await;
        println!();
        print_batch_summary(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rwa_watch=info,warn"),
            1 => EnvFilter::new("rwa_watch=debug,info"),
            2 => EnvFilter::new("rwa_watch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or defaults), then applies environment and CLI overrides
fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())
        .context("Invalid environment override")?;
    if let Some(hours) = cli.interval_hours {
        config.run.interval_hours = hours;
    }
    validate(&config).context("Invalid configuration")?;

    Ok(config)
}

/// Handles the --dry-run mode: shows the resolved plan
fn handle_dry_run(config: &Config, selection: &SourceSelection) {
    println!("=== rwa-watch Dry Run ===\n");

    println!("Session:");
    println!("  Renderer: {:?}", config.session.renderer);
    println!(
        "  Viewport: {}x{}",
        config.session.viewport_width, config.session.viewport_height
    );
    println!(
        "  Navigation timeout: {}ms",
        config.session.navigation_timeout_ms
    );
    println!("  Max scroll rounds: {}", config.session.max_scroll_rounds);
    println!(
        "  Proxy: {}",
        config.session.proxy.as_deref().unwrap_or("(none)")
    );

    println!("\nPacing:");
    println!("  Item pause: {}ms", config.run.item_pause_ms);
    println!("  Source pause: {}ms", config.run.source_pause_ms);
    println!("  Interval: {}h", config.run.interval_hours);

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir);
    println!("  CSV export: {}", config.output.csv);

    println!("\nSources to run ({}):", selection.plans.len());
    for plan in &selection.plans {
        let proxy = if plan.options.use_proxy { " [proxy]" } else { "" };
        println!("  - {} ({}){}", plan.source_name(), plan.source_id(), proxy);
    }

    if !selection.skipped.is_empty() {
        println!("\nOpt-in sources not selected ({}):", selection.skipped.len());
        for name in &selection.skipped {
            println!("  - {} (add --include {})", name, name);
        }
    }

    if !selection.unknown.is_empty() {
        println!("\nUnknown sources ({}):", selection.unknown.len());
        for name in &selection.unknown {
            println!("  - {}", name);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: shows what each source has on disk
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.output);
    println!("Data directory: {}\n", config.output.data_dir);

    for entry in config.effective_sources() {
        let Some(kind) = SourceKind::from_name(&entry.kind).map(|k| k.name()) else {
            continue;
        };
        let latest = store
            .latest_snapshot(kind)
            .with_context(|| format!("Failed to list snapshots for {}", kind))?;
        let history = match store.load_history(kind) {
            Ok(history) => history,
            Err(e) => {
                println!("  {:<10} history unreadable: {}", kind, e);
                continue;
            }
        };

        match (latest, history) {
            (None, None) => println!("  {:<10} never run", kind),
            (latest, history) => {
                let snapshot = latest
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                let known = history
                    .map(|h| format!("{} known ({})", h.total_count, h.last_updated.to_rfc3339()))
                    .unwrap_or_else(|| "no history".to_string());
                println!("  {:<10} {} | {}", kind, known, snapshot);
            }
        }
    }

    Ok(())
}

/// Handles --schedule: runs batches until Ctrl-C; a second Ctrl-C exits at once
async fn handle_schedule(
    orchestrator: &Orchestrator,
    selection: &SourceSelection,
    interval: Duration,
) {
    let cancel = CancellationToken::new();

    let stopper = cancel.clone();
    tokio::spawn(async move {
        let signals = Box::pin(futures::stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
        }));
        if watch_interrupts(signals, stopper).await {
            std::process::exit(130);
        }
    });

    tracing::info!("Scheduled mode: every {}", format_duration(interval));
    let completed = orchestrator
        .run_scheduled(selection, interval, cancel, |report| {
            println!();
            print_batch_summary(report);
        })
        .await;

    tracing::info!("Stopped after {} batches", completed);
}
