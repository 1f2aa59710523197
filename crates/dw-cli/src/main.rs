//! CLI entry point for dirwatch.
//!
//! Watches a directory and prints one line per change to stdout until Enter
//! is pressed (or the process receives Ctrl-C / SIGTERM).
//!
//! # Usage
//!
//! ```bash
//! # Watch the current directory
//! dirwatch
//!
//! # Only text files under /tmp/watched
//! dirwatch /tmp/watched --filter '*.txt'
//!
//! # Settings from a JSON file, overridden on the command line
//! dirwatch --config dirwatch.json --non-recursive
//! ```
//!
//! Log output goes to stderr so stdout carries only the change lines.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use color_eyre::eyre::{WrapErr, eyre};
use dw_core::{Config, WatchConfig};
use dw_watcher::DirectoryWatcher;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Print a line whenever a file under a directory is created, deleted,
/// modified or renamed.
#[derive(Parser)]
#[command(name = "dirwatch", version, about, long_about = None)]
struct Cli {
    /// Directory to watch.
    ///
    /// Defaults to the config file's `root_path`, then the current directory.
    #[arg(value_name = "PATH", env = "DIRWATCH_PATH")]
    path: Option<Utf8PathBuf>,

    /// Glob matched against file names (e.g. `*.txt`).
    #[arg(short, long, env = "DIRWATCH_FILTER")]
    filter: Option<String>,

    /// JSON configuration file.
    #[arg(short, long, env = "DIRWATCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Watch only the directory itself, not its subdirectories.
    #[arg(long)]
    non_recursive: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored log output.
    #[arg(long)]
    no_color: bool,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose`, or
/// `info` by default. Logs are written to stderr.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds the [`WatchConfig`] from the optional config file and CLI flags.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded, the current
/// directory is not UTF-8, or the root is not an existing directory.
fn build_config(cli: &Cli) -> color_eyre::Result<WatchConfig> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load config file {path}"))?,
        None => Config::default(),
    }
    .watch;

    if let Some(path) = &cli.path {
        config.root_path.clone_from(path);
    } else if config.root_path.as_str().is_empty() {
        let cwd = std::env::current_dir()?;
        config.root_path = Utf8PathBuf::try_from(cwd)
            .map_err(|e| eyre!("Current directory is not valid UTF-8: {}", e))?;
    }

    if let Some(filter) = &cli.filter {
        config.filter.clone_from(filter);
    }
    if cli.non_recursive {
        config.recursive = false;
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a change line to stdout.
fn print_change(action: &str, path: &Utf8Path) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "File {action}: {path}");
}

/// Registers the console listeners for all four categories.
fn subscribe_console(watcher: &DirectoryWatcher) {
    watcher.on_created(|path| print_change("created", path));
    watcher.on_deleted(|path| print_change("deleted", path));
    watcher.on_modified(|path| print_change("modified", path));
    watcher.on_renamed(|path| print_change("renamed", path));
}

// =============================================================================
// COMMAND IMPLEMENTATION
// =============================================================================

/// Resolves once a line (or EOF) arrives on stdin, or on Ctrl-C / SIGTERM.
///
/// Stdin is read on a plain thread so a pending read never holds up runtime
/// shutdown. Returns what triggered the exit.
async fn wait_for_exit() -> color_eyre::Result<&'static str> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("stdin-wait".to_owned())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            let _ = tx.send(());
        })?;

    #[cfg(unix)]
    let reason = {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = rx => "input",
            _ = tokio::signal::ctrl_c() => "ctrl-c",
            _ = sigterm.recv() => "SIGTERM",
        }
    };

    #[cfg(not(unix))]
    let reason = tokio::select! {
        _ = rx => "input",
        _ = tokio::signal::ctrl_c() => "ctrl-c",
    };

    Ok(reason)
}

/// Watches `config.root_path` until the user asks to exit.
///
/// # Errors
///
/// Returns an error if the watch cannot be set up or stdout is closed.
async fn run_watch(config: &WatchConfig) -> color_eyre::Result<()> {
    let watcher = DirectoryWatcher::from_config(config)
        .wrap_err_with(|| format!("Failed to watch {}", config.root_path))?;

    subscribe_console(&watcher);
    watcher.start();

    {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "File monitoring started. Press Enter to exit.")?;
        handle.flush()?;
    }

    let reason = wait_for_exit().await?;
    info!(reason, "Shutting down");

    watcher.stop();
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = build_config(&cli)?;
    info!(
        path = %config.root_path,
        filter = %config.filter,
        recursive = config.recursive,
        "Starting dirwatch"
    );

    run_watch(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dirwatch").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = parse(&["/tmp/watched", "--filter", "*.txt", "--non-recursive", "-v"]);
        assert_eq!(cli.path.as_deref().map(Utf8Path::as_str), Some("/tmp/watched"));
        assert_eq!(cli.filter.as_deref(), Some("*.txt"));
        assert!(cli.non_recursive);
        assert!(cli.verbose);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_build_config_from_flags() {
        let temp_dir = std::env::temp_dir();
        let root = Utf8PathBuf::try_from(temp_dir).expect("Invalid path");
        let cli = parse(&[root.as_str(), "-f", "*.log", "--non-recursive"]);

        let config = build_config(&cli).expect("config");
        assert_eq!(config.root_path, root);
        assert_eq!(config.filter, "*.log");
        assert!(!config.recursive);
    }

    #[test]
    fn test_build_config_rejects_missing_root() {
        let cli = parse(&["/nonexistent/path/that/does/not/exist"]);
        assert!(build_config(&cli).is_err());
    }
}
