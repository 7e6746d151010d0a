//! Gatherly HTTP server.
//!
//! ```bash
//! # In-memory (default)
//! cargo run --bin gatherly-server
//!
//! # PostgreSQL
//! STORAGE_BACKEND=postgres DATABASE_URL=postgres://... cargo run --bin gatherly-server
//! ```

use gatherly_server::{build_router, AppState, Config};
use std::sync::Arc;
use tokio::{signal, sync::Notify};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gatherly_server=debug,sqlx=warn,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gatherly server");

    let config = Config::from_env();
    info!(
        backend = ?config.storage.backend,
        address = %config.server.address(),
        "Configuration loaded"
    );

    let state = AppState::from_config(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    info!(address = %config.server.address(), "Server listening");

    let stop = Arc::new(Notify::new());
    let mut server = tokio::spawn({
        let stop = Arc::clone(&stop);
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .await
        }
    });

    tokio::select! {
        result = &mut server => {
            result??;
            info!("Server stopped");
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    // Drain in-flight requests, but not forever
    stop.notify_one();
    match tokio::time::timeout(config.server.shutdown_grace(), server).await {
        Ok(result) => result??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout,
            "Graceful shutdown timed out"
        ),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
