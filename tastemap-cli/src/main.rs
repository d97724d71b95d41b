//! Tastemap (tastemap) - Main entry point
//!
//! Loads the wine catalog, then runs an interactive session on stdin/stdout:
//! sliders and chart picks move the taste target, scans jump to an item,
//! and the nearest items are listed after every change.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tastemap_cli::capture::{run_capture, LineSource};
use tastemap_cli::{load_catalog, source_for, App, OutputMode};
use tastemap_common::config::load_config;
use tastemap_common::scan::CodeNormalization;
use tastemap_common::{SessionOptions, TasteSession};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tastemap
#[derive(Parser, Debug)]
#[command(name = "tastemap")]
#[command(about = "Wine taste map: rank catalog items around a taste target")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/tastemap/config.toml)
    #[arg(short, long, env = "TASTEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Coordinates table (path or http(s) URL)
    #[arg(long)]
    coordinates: Option<String>,

    /// Metadata table (path or http(s) URL)
    #[arg(long)]
    metadata: Option<String>,

    /// Number of items listed
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Scanned code comparison: trim or digits
    #[arg(long)]
    normalization: Option<CodeNormalization>,

    /// Line-oriented barcode scanner device or FIFO
    #[arg(long)]
    scanner: Option<PathBuf>,

    /// Give up on a scan after this many seconds
    #[arg(long)]
    scan_timeout: Option<u64>,

    /// Print views as JSON
    #[arg(long)]
    json: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration: CLI > environment > TOML > defaults
    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(coordinates) = args.coordinates {
        config.catalog.coordinates = coordinates;
    }
    if let Some(metadata) = args.metadata {
        config.catalog.metadata = metadata;
    }
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if let Some(normalization) = args.normalization {
        config.code_normalization = normalization;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate().context("Invalid configuration")?;

    // Logs go to stderr so stdout carries only views
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting tastemap");
    info!(
        top_k = config.top_k,
        normalization = ?config.code_normalization,
        "Configuration resolved"
    );

    let coordinates = source_for(&config.catalog.coordinates);
    let metadata = source_for(&config.catalog.metadata);
    let report = load_catalog(coordinates.as_ref(), metadata.as_ref())
        .await
        .context("Catalog unavailable")?;
    let skipped = report.skipped.len();

    let (session, capture_rx) = TasteSession::new(Arc::new(report.catalog), SessionOptions::from(&config));
    session.announce_catalog(skipped);

    let mode = if args.json { OutputMode::Json } else { OutputMode::Text };
    let mut app = App::new(session, capture_rx, tokio::io::stdout(), mode);
    if let Some(secs) = args.scan_timeout.filter(|s| *s > 0) {
        app = app.with_scan_timeout(Duration::from_secs(secs));
    }

    if let Some(path) = args.scanner {
        match LineSource::open(&path).await {
            Ok(source) => {
                tokio::spawn(run_capture(source, app.active_scan()));
            }
            Err(e) => warn!(error = %e, "Scanner unavailable, use 'decode' instead"),
        }
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = app.run(stdin) => result.context("Session failed")?,
        _ = shutdown_signal() => {}
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
