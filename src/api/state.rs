//! Application state for shared services

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::api::middleware::BasicCredentials;
use crate::domain::{DataTable, DomainError, Label};
use crate::infrastructure::estimator::ModelTypeInfo;
use crate::infrastructure::services::{BackendHealth, ModelService, TrainRequest};

/// Application state shared by the REST and RPC front-ends
#[derive(Clone)]
pub struct AppState {
    pub model_service: Arc<dyn ModelServiceTrait>,
    /// REST Basic credentials; `None` disables authentication
    pub credentials: Option<Arc<BasicCredentials>>,
}

impl AppState {
    pub fn new(model_service: Arc<dyn ModelServiceTrait>) -> Self {
        Self {
            model_service,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }
}

/// Model lifecycle operations consumed by the transports
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ModelServiceTrait: Send + Sync {
    async fn train(&self, request: TrainRequest) -> Result<(), DomainError>;
    async fn retrain(&self, model_name: &str, data: DataTable) -> Result<(), DomainError>;
    async fn predict(&self, model_name: &str, data: DataTable) -> Result<Vec<Label>, DomainError>;
    async fn delete(&self, model_name: &str) -> Result<(), DomainError>;
    fn is_supported(&self, model_type: &str) -> bool;
    fn model_types(&self) -> Vec<ModelTypeInfo>;
    async fn backend_health(&self) -> BackendHealth;
}

#[async_trait::async_trait]
impl ModelServiceTrait for ModelService {
    async fn train(&self, request: TrainRequest) -> Result<(), DomainError> {
        ModelService::train(self, request).await
    }

    async fn retrain(&self, model_name: &str, data: DataTable) -> Result<(), DomainError> {
        ModelService::retrain(self, model_name, data).await
    }

    async fn predict(&self, model_name: &str, data: DataTable) -> Result<Vec<Label>, DomainError> {
        ModelService::predict(self, model_name, data).await
    }

    async fn delete(&self, model_name: &str) -> Result<(), DomainError> {
        ModelService::delete(self, model_name).await
    }

    fn is_supported(&self, model_type: &str) -> bool {
        ModelService::is_supported(self, model_type)
    }

    fn model_types(&self) -> Vec<ModelTypeInfo> {
        ModelService::model_types(self)
    }

    async fn backend_health(&self) -> BackendHealth {
        ModelService::backend_health(self).await
    }
}
