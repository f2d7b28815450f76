// folio-edge - offline-first caching edge for the portfolio dashboard
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use folio_edge::cache::SnapshotStore;
use folio_edge::cli::Args;
use folio_edge::config::{AppConfig, WorkerSettings};
use folio_edge::network::HttpFetcher;
use folio_edge::server::create_router;
use folio_edge::utils::logging;
use folio_edge::worker::{CacheController, WorkerLifecycle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting folio-edge v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the immutable worker settings and the network client
    let settings = Arc::new(WorkerSettings::from_config(&config.worker)?);
    let fetcher = HttpFetcher::new(&config.network, &settings)?;

    if settings.upstream_origin().is_none() {
        warn!(
            "worker.upstream_origin is unset; same-origin fetches go to {} directly",
            settings.origin()
        );
    }

    // Phase 4: Restore saved generations
    let snapshots = config
        .storage
        .enabled
        .then(|| SnapshotStore::new(&config.storage.directory));

    let snapshot = match &snapshots {
        Some(store) => match store.load().await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable cache snapshot: {}", e);
                Default::default()
            }
        },
        None => Default::default(),
    };

    let mut controller =
        CacheController::from_snapshot(Arc::clone(&settings), Arc::new(fetcher.clone()), snapshot);
    if let Some(store) = snapshots {
        controller = controller.with_snapshots(store);
    }
    let controller = Arc::new(controller);

    // Phase 5: Install and activate the current generation
    run_lifecycle(&controller).await;

    // Phase 6: Build and start HTTP server
    let app = create_router(config.clone(), Arc::clone(&controller), fetcher)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 7: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = controller.persist().await {
        error!("Failed to save cache snapshot: {}", e);
    }

    info!("Server shut down gracefully");
    Ok(())
}

/// Install, then activate if install succeeded and asked to skip waiting.
/// A failed install leaves the previously active generation serving.
async fn run_lifecycle(controller: &CacheController) {
    match controller.on_install().await {
        Ok(report) if report.skip_waiting => {
            if let Err(e) = controller.on_activate().await {
                error!("Activation of {} failed: {}", report.version, e);
            }
        }
        Ok(report) => info!("Generation {} installed, waiting", report.version),
        Err(e) => match controller.active_generation() {
            Some(active) => warn!("Install failed ({}); still serving from {}", e, active),
            None => warn!("Install failed ({}); passing all requests through", e),
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
