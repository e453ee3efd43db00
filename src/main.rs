//! Application entry point for the `airgrid-siting` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the dataset provider (local directory, then object store)
//! - Loading and publishing the first data generation
//! - Spawning the periodic refresh task
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! See [`airgrid_siting::config::load_from_env`] for the full list.
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use airgrid_siting::{
    config,
    dataset::{DatasetProvider, FallbackProvider, LocalProvider, RemoteProvider},
    refresh, routes, Config, SnapshotStore,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let provider = build_provider(&cfg);
    let store = Arc::new(SnapshotStore::new());

    // Serve 503s rather than exit if the first load fails; the refresh task
    // keeps trying.
    match refresh::refresh_once(provider.as_ref(), &store, &cfg.scoring()).await {
        Ok(snapshot) => tracing::info!(
            "Initial data generation {} loaded at {}",
            snapshot.generation(),
            snapshot.loaded_at()
        ),
        Err(e) => tracing::error!("Initial dataset load failed: {}", e),
    }

    refresh::spawn_refresh_loop(
        provider.clone(),
        store.clone(),
        cfg.scoring(),
        cfg.refresh_interval(),
    );

    let addr = cfg.listen_addr;

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(store, cfg);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Local directory first, then the object store when one is configured.
fn build_provider(cfg: &Config) -> Arc<dyn DatasetProvider> {
    // ---
    let local = LocalProvider::new(cfg.data_dir.clone());
    tracing::info!("Reading local tables from {}", local.dir().display());

    let remote: Option<Box<dyn DatasetProvider>> = cfg.dataset_base_url.as_ref().map(|url| {
        tracing::info!("Falling back to object store at {}", url);
        Box::new(RemoteProvider::new(url.clone(), cfg.sensor_lookback_days))
            as Box<dyn DatasetProvider>
    });

    Arc::new(FallbackProvider::new(Box::new(local), remote))
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AXUM_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
