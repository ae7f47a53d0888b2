//! CLI entry point for dbx-ignore.
//!
//! This binary keeps Dropbox folders free of build output, dependency caches
//! and other churn by applying the Dropbox "ignored" marker to every path
//! matched by `.dropboxignore` files.
//!
//! # Usage
//!
//! ```bash
//! dbx-ignore [OPTIONS] <COMMAND>
//!
//! # Watch the Dropbox folders listed in ~/.dropbox/info.json
//! dbx-ignore watch
//!
//! # Watch a specific folder without writing markers, keeping a JSON report
//! dbx-ignore --root ~/Dropbox --try-run watch --report state.json
//!
//! # Apply the rules once and exit
//! dbx-ignore scan
//!
//! # Inspect or clear markers by hand
//! dbx-ignore status ~/Dropbox/project/node_modules
//! dbx-ignore unignore ~/Dropbox/project/node_modules
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre};
use dbx_core::{discover_dropbox_roots, info_json_locations, Config, Debouncer};
use dbx_engine::{watch_root, IgnoreEngine, SharedSets};
use dbx_marker::{platform_marker, IgnoreMarker};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Marks paths matched by `.dropboxignore` files as ignored by Dropbox.
///
/// Rule files use the gitignore syntax without negation. A rule file applies
/// to its own directory and everything below it.
#[derive(Parser)]
#[command(name = "dbx-ignore", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Folder to watch. Repeatable.
    ///
    /// Defaults to the folders listed in Dropbox's `info.json`.
    #[arg(
        short,
        long = "root",
        global = true,
        env = "DBX_IGNORE_ROOTS",
        value_delimiter = ','
    )]
    roots: Vec<Utf8PathBuf>,

    /// Log and record decisions without writing any marker.
    #[arg(short, long, global = true)]
    try_run: bool,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "DBX_IGNORE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Apply the rules, then keep applying them as files change.
    Watch {
        /// Keep a JSON report of ignored paths and rule files at this path.
        #[arg(long)]
        report: Option<Utf8PathBuf>,
    },

    /// Apply the rules once and print what is ignored.
    Scan,

    /// Print whether each path carries the ignore marker.
    Status {
        /// Paths to inspect.
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
    },

    /// Remove the ignore marker from each path.
    Unignore {
        /// Paths to clear.
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Noisy crates like `notify` and `mio` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the configuration file and CLI arguments.
///
/// CLI roots are appended to the file's roots and `--try-run` can only turn
/// try-run on.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the result is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    config.roots.extend(cli.roots.iter().cloned());
    config.engine.try_run |= cli.try_run;
    if let Commands::Watch {
        report: Some(report),
    } = &cli.command
    {
        config.report.output = Some(report.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Falls back to the Dropbox folders when no root is configured.
///
/// # Errors
///
/// Returns an error if no root is configured and no Dropbox folder is found.
fn resolve_roots(config: &mut Config) -> color_eyre::Result<()> {
    if config.roots.is_empty() {
        config.roots = discover_dropbox_roots(&info_json_locations())?;
        info!(roots = ?config.roots, "Using Dropbox folders from info.json");
    }
    Ok(())
}

/// Returns the marker for this platform.
///
/// # Errors
///
/// Returns an error if this platform has no marker mechanism; nothing can
/// be ignored then.
fn create_marker() -> color_eyre::Result<Arc<dyn IgnoreMarker>> {
    platform_marker().map_err(|e| eyre!("Cannot mark paths on this system: {e}"))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches every root until Ctrl-C or SIGTERM.
///
/// A root that fails to start is logged and skipped; the command fails only
/// if no root could be watched. A signal during the initial walks cancels
/// them and skips the roots not yet started.
///
/// # Errors
///
/// Returns an error if no root could be watched or signal handling fails.
async fn run_watch(config: &Config) -> color_eyre::Result<()> {
    let marker = create_marker()?;
    let sets = SharedSets::new();
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let shutdown = cancel_on(wait_for_shutdown(), &cancel);

    let reporter = Reporter::new(config, sets.clone());
    let debouncer = {
        let reporter = reporter.clone();
        Debouncer::new(
            move || reporter.publish(),
            Duration::from_millis(config.report.debounce_ms),
        )
    };
    let listeners = [
        (Arc::clone(&sets.ignored_paths), {
            let debouncer = debouncer.clone();
            sets.ignored_paths.on_change(move |_| debouncer.call())
        }),
        (Arc::clone(&sets.rule_files), {
            let debouncer = debouncer.clone();
            sets.rule_files.on_change(move |_| debouncer.call())
        }),
    ];

    let mut handles = Vec::with_capacity(config.roots.len());
    for root in &config.roots {
        if cancel.is_cancelled() {
            warn!(root = %root, "Shutdown requested, not starting root");
            continue;
        }
        let started = watch_root(
            root,
            &config.engine,
            &config.watch,
            sets.clone(),
            Arc::clone(&marker),
            cancel.clone(),
            &tracker,
        )
        .await;
        match started {
            Ok(handle) => handles.push(handle),
            Err(e) if e.is_cancellation() => info!(root = %root, "Root start cancelled"),
            Err(e) => error!(root = %root, error = %e, "Failed to watch root"),
        }
    }
    if handles.is_empty() && !cancel.is_cancelled() {
        tracker.close();
        shutdown.abort();
        bail!("None of the {} configured roots could be watched", config.roots.len());
    }
    if !handles.is_empty() {
        info!(roots = handles.len(), try_run = config.engine.try_run, "Watching");
    }

    cancel.cancelled().await;

    tracker.close();
    tracker.wait().await;
    for handle in handles {
        match handle.await {
            Ok(engine) => info!(root = %engine.root(), "Root released"),
            Err(e) => warn!(error = %e, "Engine task failed"),
        }
    }

    for (set, id) in listeners {
        set.remove_listener(id);
    }
    reporter.publish();
    shutdown.await??;
    Ok(())
}

/// Cancels `cancel` once `signal` completes and hands back its result.
///
/// The task ends quietly if the token is cancelled some other way first.
fn cancel_on<F>(signal: F, cancel: &CancellationToken) -> JoinHandle<color_eyre::Result<()>>
where
    F: Future<Output = color_eyre::Result<()>> + Send + 'static,
{
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => Ok(()),
            result = signal => {
                cancel.cancel();
                result
            }
        }
    })
}

/// Completes on Ctrl-C, or on SIGTERM on Unix.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
async fn wait_for_shutdown() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}

/// Runs the initial walk of every root once and prints the result.
///
/// Ctrl-C or SIGTERM stops the walk in progress; the summary then covers
/// only what was scanned.
///
/// # Errors
///
/// Returns an error if no marker is available, signal handling fails, or any
/// root fails to start.
async fn run_scan(config: &Config) -> color_eyre::Result<()> {
    let marker = create_marker()?;
    let sets = SharedSets::new();
    let cancel = CancellationToken::new();
    let shutdown = cancel_on(wait_for_shutdown(), &cancel);

    let failed = scan_roots(config, &sets, &marker, &cancel).await?;

    print_summary(&sets, config.engine.try_run);

    if cancel.is_cancelled() {
        warn!("Scan interrupted, summary is partial");
        shutdown.await??;
    } else {
        shutdown.abort();
    }
    if failed > 0 {
        bail!("{failed} of {} roots could not be scanned", config.roots.len());
    }
    Ok(())
}

/// Walks each root on a blocking thread, stopping once `cancel` fires.
///
/// Returns the number of roots that failed to start.
///
/// # Errors
///
/// Returns an error if a walk task panicked.
async fn scan_roots(
    config: &Config,
    sets: &SharedSets,
    marker: &Arc<dyn IgnoreMarker>,
    cancel: &CancellationToken,
) -> color_eyre::Result<usize> {
    let mut failed = 0usize;
    for root in &config.roots {
        if cancel.is_cancelled() {
            warn!(root = %root, "Shutdown requested, skipping root");
            continue;
        }
        info!(root = %root, "Scanning");
        let walk = {
            let root = root.clone();
            let engine_config = config.engine.clone();
            let sets = sets.clone();
            let marker = Arc::clone(marker);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                IgnoreEngine::init(&root, &engine_config, sets, marker, cancel)
            })
        };
        match walk.await? {
            Ok(_) => {}
            Err(e) if e.is_cancellation() => info!(root = %root, "Scan cancelled"),
            Err(e) => {
                error!(root = %root, error = %e, "Failed to scan root");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

/// Prints the marker state of each path.
///
/// # Errors
///
/// Returns an error if no marker is available or any path cannot be read.
fn run_status(paths: &[Utf8PathBuf]) -> color_eyre::Result<()> {
    let marker = create_marker()?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let mut failed = 0usize;
    for path in paths {
        match marker.has_flag(path) {
            Ok(true) => writeln!(handle, "ignored  {path}")?,
            Ok(false) => writeln!(handle, "synced   {path}")?,
            Err(e) => {
                error!(error = %e, "Failed to read marker");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} paths could not be inspected", paths.len());
    }
    Ok(())
}

/// Removes the marker from each path.
///
/// # Errors
///
/// Returns an error if no marker is available or any path cannot be cleared.
fn run_unignore(paths: &[Utf8PathBuf]) -> color_eyre::Result<()> {
    let marker = create_marker()?;

    let mut failed = 0usize;
    for path in paths {
        match marker.remove_flag(path) {
            Ok(()) => info!(path = %path, "Removed ignore marker"),
            Err(e) => {
                error!(error = %e, "Failed to remove marker");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} paths could not be cleared", paths.len());
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Logs the current state and keeps the JSON report up to date.
#[derive(Clone)]
struct Reporter {
    roots: Arc<[Utf8PathBuf]>,
    try_run: bool,
    output: Option<Utf8PathBuf>,
    sets: SharedSets,
}

/// JSON report of the shared state.
#[derive(serde::Serialize)]
struct Report<'a> {
    roots: &'a [Utf8PathBuf],
    try_run: bool,
    ignored_paths: Vec<String>,
    rule_files: Vec<String>,
}

impl Reporter {
    fn new(config: &Config, sets: SharedSets) -> Self {
        Self {
            roots: config.roots.iter().cloned().collect(),
            try_run: config.engine.try_run,
            output: config.report.output.clone(),
            sets,
        }
    }

    fn report(&self) -> Report<'_> {
        Report {
            roots: &self.roots,
            try_run: self.try_run,
            ignored_paths: self.sets.ignored_paths.values(),
            rule_files: self.sets.rule_files.values(),
        }
    }

    fn publish(&self) {
        let report = self.report();
        info!(
            ignored = report.ignored_paths.len(),
            rule_files = report.rule_files.len(),
            "Ignore state changed"
        );
        if let Some(output) = &self.output {
            if let Err(e) = write_report(output, &report) {
                warn!(path = %output, error = %e, "Failed to write report");
            }
        }
    }
}

/// Writes `report` as pretty JSON to `path`.
fn write_report(path: &Utf8Path, report: &Report<'_>) -> color_eyre::Result<()> {
    let content = serde_json::to_string_pretty(report)
        .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?;
    std::fs::write(path.as_std_path(), content)?;
    Ok(())
}

/// Prints the ignored paths and known rule files.
fn print_summary(sets: &SharedSets, try_run: bool) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let ignored = sets.ignored_paths.values();
    let rule_files = sets.rule_files.values();
    let heading = if try_run { "Would ignore" } else { "Ignored" };

    let _ = writeln!(handle);
    let _ = writeln!(handle, "{heading} ({}):", ignored.len());
    for path in &ignored {
        let _ = writeln!(handle, "  {path}");
    }
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Rule files ({}):", rule_files.len());
    for path in &rule_files {
        let _ = writeln!(handle, "  {path}");
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Watch { .. } => {
            let mut config = build_config(&cli)?;
            resolve_roots(&mut config)?;
            run_watch(&config).await
        }
        Commands::Scan => {
            let mut config = build_config(&cli)?;
            resolve_roots(&mut config)?;
            run_scan(&config).await
        }
        Commands::Status { paths } => run_status(paths),
        Commands::Unignore { paths } => run_unignore(paths),
    }
}
