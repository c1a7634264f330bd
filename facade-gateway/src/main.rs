//! Entry point for the `facade-gateway` HTTP server.

use std::sync::Arc;

use clap::Parser;
use facade_executor::{PgBackend, QueryExecutor};
use facade_gateway::{config::GatewayConfig, routes::create_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    let config = GatewayConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let backend = match PgBackend::connect(&config.database()).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    let executor = match config.execution_timeout() {
        Some(limit) => QueryExecutor::with_timeout(backend.clone(), limit),
        None => QueryExecutor::new(backend.clone()),
    };
    info!(execution_timeout = ?executor.timeout(), "query executor ready");
    let app = create_router(Arc::new(executor));

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %config.listen_addr, "facade-gateway listening");

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
    backend.close().await;

    if let Err(e) = served {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
