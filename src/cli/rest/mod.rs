//! REST command - runs the HTTP server only

use std::path::Path;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{AppState, create_router_with_metrics};
use crate::config::AppConfig;
use crate::infrastructure::observability::init_metrics;

/// Run the REST server
pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, state) = super::bootstrap(config_path).await?;
    serve(&config, state).await
}

pub(crate) async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let metrics = init_metrics(&config.metrics);
    let app = create_router_with_metrics(state, metrics, &config.metrics.path);

    let addr = super::socket_addr(&config.server.host, config.server.port)?;
    info!("Starting REST server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(super::shutdown_signal())
        .await?;

    info!("REST server shutdown complete");
    Ok(())
}
