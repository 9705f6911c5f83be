//! HTTP server setup and lifecycle management
//!
//! This module handles:
//! - TCP listener setup
//! - Graceful shutdown on signals (SIGTERM, SIGINT)

use crate::{routes, state::AppState};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// HTTP server instance
pub struct Server {
    addr: String,
    request_timeout: Duration,
    state: AppState,
}

impl Server {
    /// Create a new server bound to `addr` once run
    pub fn new(addr: impl Into<String>, request_timeout: Duration, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            request_timeout,
            state,
        }
    }

    /// Serve until SIGINT or SIGTERM, then drain active connections
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .context(format!("Failed to bind to {}", self.addr))?;

        let local_addr = listener.local_addr()?;
        info!("Server listening on http://{}", local_addr);
        info!("Search endpoint: http://{}{}", local_addr, routes::SEARCH_PATH);

        let app = routes::create_router(self.state, self.request_timeout);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
