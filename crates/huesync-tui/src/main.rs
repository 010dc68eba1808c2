//! `huesync` — mirror the average on-screen color to a Philips Hue
//! entertainment area in near real time.
//!
//! The binary discovers a bridge via mDNS, pairs on first use, activates an
//! entertainment area, opens a PSK DTLS streaming session, and pushes one
//! color frame per tick derived from the local display.
//!
//! Logs are written to a file (default `/tmp/huesync.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod event;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use huesync_core::CredentialStore;

use crate::app::App;

/// Mirror the average screen color to a Hue entertainment area.
#[derive(Parser, Debug)]
#[command(name = "huesync", version, about)]
struct Cli {
    /// Default capture delay in milliseconds (prefills the prompt)
    #[arg(short, long, default_value_t = 100)]
    delay: u64,

    /// Log file path
    #[arg(long, default_value = "/tmp/huesync.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. Returns a guard that must be held for the
/// lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "huesync_tui={log_level},huesync_core={log_level},huesync_api={log_level}"
        ))
    });

    let log_dir = cli.log_file.parent().unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("huesync.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    info!(delay_ms = cli.delay, "starting huesync");

    let store = CredentialStore::new()?;
    let mut app = App::new(store, cli.delay);
    app.run().await?;

    // The terminal is restored by now; a fatal error ends the process
    // non-zero with the message on stderr.
    if let Some(err) = app.fatal_error() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
