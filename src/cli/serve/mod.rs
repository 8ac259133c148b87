//! Serve command - runs the REST and gRPC servers side by side

use std::path::Path;

use tracing::info;

/// Run both servers until either fails or a shutdown signal arrives
pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, state) = super::bootstrap(config_path).await?;

    info!(
        rest_port = config.server.port,
        grpc_port = config.server.grpc_port,
        "Starting REST and gRPC servers"
    );

    tokio::try_join!(
        super::rest::serve(&config, state.clone()),
        super::grpc::serve(&config, state),
    )?;

    Ok(())
}
