//! Web dashboard - a polling HTML page plus a small JSON control API.

pub mod handlers;
pub mod page;
pub mod routes;

pub use handlers::{CommandResponse, DashboardState, StatsResponse};
pub use routes::create_router;

use crate::pipeline::Pipeline;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors from the dashboard server.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[source] std::io::Error),

    #[error("Server error: {0}")]
    ServeError(#[source] std::io::Error),
}

/// Configuration for the dashboard server.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

pub struct DashboardServer {
    config: DashboardConfig,
    pipeline: Arc<Pipeline>,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Serve until `shutdown` resolves, then drain open connections.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), DashboardError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.listen_addr;
        let router = create_router(self.pipeline);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(DashboardError::BindError)?;
        info!(addr = %addr, "Dashboard listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(DashboardError::ServeError)?;

        info!("Dashboard shut down");
        Ok(())
    }
}
