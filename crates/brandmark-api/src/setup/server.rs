//! Server startup and graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use brandmark_core::Config;
use std::net::SocketAddr;

/// Bind the configured port and serve `app` until a shutdown signal arrives.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let upload = config.upload();
    tracing::info!(
        addr = %addr,
        environment = config.environment(),
        logo_max_bytes = upload.logo_max_size_bytes,
        logo_content_types = %upload.logo_allowed_content_types.join(","),
        ticket_ttl_secs = upload.ticket_ttl_secs,
        storage_backend = %config.storage().backend,
        "Brandmark API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated with an error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, then flushes telemetry.
///
/// # Panics
/// Panics if a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = terminate => "terminate",
    };

    tracing::info!(signal, "Shutdown requested, draining in-flight requests");
    crate::telemetry::shutdown_telemetry().await;
}
