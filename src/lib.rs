//! Model lifecycle service
//!
//! Trains, retrains, serves predictions from and deletes named classifiers,
//! persisting them to a local directory or an S3-compatible object store.
//! Exposed over REST (axum) and gRPC (tonic).

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod grpc;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use api::{AppState, middleware::BasicCredentials};
use infrastructure::{
    artifact::{ArtifactLayout, ArtifactStore},
    estimator::EstimatorRegistry,
    services::ModelService,
    storage::BackendFactory,
};

/// Build the model service from configuration
pub async fn create_model_service(config: &AppConfig) -> anyhow::Result<ModelService> {
    let backend_config = config
        .storage
        .backend_config()
        .map_err(anyhow::Error::msg)?;

    info!(backend = ?backend_config.backend_type(), "Creating storage backend");
    let backend = BackendFactory::create(&backend_config)
        .await
        .context("Failed to create storage backend")?;

    let layout = ArtifactLayout::new(
        &config.storage.models_dir,
        &config.storage.artifact_extension,
    );
    let store = ArtifactStore::new(backend, layout).with_io_timeout(config.storage.io_timeout());

    Ok(
        ModelService::new(EstimatorRegistry::with_defaults(), store)
            .with_max_concurrent_jobs(config.workers.max_concurrent_jobs),
    )
}

/// Create the application state shared by both transports
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let service = create_model_service(config).await?;
    let state = AppState::new(Arc::new(service));

    Ok(match config.auth.credentials() {
        Some((username, password)) => {
            info!(username = %username, "REST Basic authentication enabled");
            state.with_credentials(BasicCredentials::new(username, password))
        }
        None => state,
    })
}
