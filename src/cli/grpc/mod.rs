//! gRPC command - runs the RPC server only

use std::path::Path;

use tonic::transport::Server;
use tracing::info;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::grpc::ModelServiceGrpc;

/// Run the gRPC server
pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, state) = super::bootstrap(config_path).await?;
    serve(&config, state).await
}

pub(crate) async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let addr = super::socket_addr(&config.server.host, config.server.grpc_port)?;
    info!("Starting gRPC server on {}", addr);

    Server::builder()
        .add_service(ModelServiceGrpc::new(state.model_service).into_server())
        .serve_with_shutdown(addr, super::shutdown_signal())
        .await?;

    info!("gRPC server shutdown complete");
    Ok(())
}
