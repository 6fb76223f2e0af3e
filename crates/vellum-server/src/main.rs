// SPDX-License-Identifier: MIT
//
// Vellum: stateless HTTP service for office-document conversion and
// password protection.
//
// Entry point. Initialises logging, resolves configuration, probes for the
// external document engine once, and serves the router until shutdown.

mod error;
mod extract;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use vellum_convert::{DocxEngine, ProcessBridge, ScratchDir};
use vellum_core::config::AppConfig;
use vellum_dispatch::Dispatcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    info!(?config, "vellum starting");

    let scratch = ScratchDir::new(&config.scratch_dir)?;

    let bridge = Arc::new(ProcessBridge);
    let timeout = Duration::from_secs(config.conversion_timeout_secs);
    let engine = DocxEngine::detect(config.soffice_path.as_deref(), bridge, timeout).await;
    if engine.is_none() {
        warn!("serving without a document engine; /word-to-pdf will return 503");
    }

    let app = routes::build_router(Dispatcher::new(scratch, engine));

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
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
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
