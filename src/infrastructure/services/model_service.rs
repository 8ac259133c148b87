//! Model service - train, retrain, predict and delete named models

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::domain::{
    DataTable, DomainError, Estimator, EstimatorParams, Label, ModelName,
};
use crate::infrastructure::artifact::ArtifactStore;
use crate::infrastructure::estimator::{EstimatorRegistry, ModelTypeInfo};
use crate::infrastructure::observability::record_model_operation;

pub const DEFAULT_MODEL_TYPE: &str = "SVC";
pub const DEFAULT_MODEL_NAME: &str = "my_model";
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Request to train and store a new model
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub model_type: String,
    pub model_name: String,
    pub params: EstimatorParams,
    pub data: DataTable,
}

/// Backend check result reported by health checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendHealth {
    pub name: String,
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Model service composing the estimator registry and the artifact store
#[derive(Debug, Clone)]
pub struct ModelService {
    registry: Arc<EstimatorRegistry>,
    store: ArtifactStore,
    jobs: Arc<Semaphore>,
}

fn outcome(result: &Result<impl Sized, DomainError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind_name(),
    }
}

fn log_failure(operation: &str, model_name: &str, err: &DomainError) {
    match err {
        DomainError::Backend { .. } => {
            error!(operation = operation, model_name = %model_name, error = %err, "Operation failed")
        }
        _ => warn!(operation = operation, model_name = %model_name, error = %err, "Operation rejected"),
    }
}

impl ModelService {
    pub fn new(registry: EstimatorRegistry, store: ArtifactStore) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            jobs: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_JOBS)),
        }
    }

    /// Bound on concurrently running fit/predict jobs
    pub fn with_max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Arc::new(Semaphore::new(jobs.max(1)));
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    async fn run_job<T, F>(&self, job: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .jobs
            .acquire()
            .await
            .map_err(|e| DomainError::io(format!("Worker pool closed: {}", e)))?;

        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| DomainError::io(format!("Worker task failed: {}", e)))?
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        model_name: &str,
        started: Instant,
        result: Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        record_model_operation(operation, outcome(&result), started.elapsed());

        match &result {
            Ok(_) => info!(
                operation = operation,
                model_name = %model_name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Operation completed"
            ),
            Err(e) => log_failure(operation, model_name, e),
        }

        result
    }

    /// Train a new estimator and store it under the requested name
    pub async fn train(&self, request: TrainRequest) -> Result<(), DomainError> {
        let started = Instant::now();
        info!(model_type = %request.model_type, model_name = %request.model_name, "Training model");

        let model_name = request.model_name.clone();
        let result = self.train_inner(request).await;
        self.finish("train", &model_name, started, result)
    }

    async fn train_inner(&self, request: TrainRequest) -> Result<(), DomainError> {
        // Unknown types fail before any parsing or I/O
        if !self.registry.is_supported(&request.model_type) {
            return Err(DomainError::unsupported_type(request.model_type));
        }

        let name = ModelName::parse(&request.model_name)?;
        let mut estimator = self.registry.construct(&request.model_type, &request.params)?;
        let data = request.data.into_training_set()?;

        let estimator = self
            .run_job(move || {
                estimator.fit(&data)?;
                Ok(estimator)
            })
            .await?;

        self.store.save(&name, &estimator).await
    }

    /// Re-fit a stored model on new data, replacing the stored artifact
    pub async fn retrain(&self, model_name: &str, data: DataTable) -> Result<(), DomainError> {
        let started = Instant::now();
        info!(model_name = %model_name, "Retraining model");

        let result = self.retrain_inner(model_name, data).await;
        self.finish("retrain", model_name, started, result)
    }

    async fn retrain_inner(&self, model_name: &str, data: DataTable) -> Result<(), DomainError> {
        let name = ModelName::parse(model_name)?;
        let data = data.into_training_set()?;

        // Only the fit occupies a worker slot; loading and saving do not
        self.store
            .retrain(&name, |mut estimator| {
                self.run_job(move || {
                    estimator
                        .fit(&data)
                        .map_err(|e| DomainError::fit(e.to_string()))?;
                    Ok(estimator)
                })
            })
            .await
            .map(|_| ())
    }

    /// Predict a label for every row of the table
    pub async fn predict(&self, model_name: &str, data: DataTable) -> Result<Vec<Label>, DomainError> {
        let started = Instant::now();
        info!(model_name = %model_name, "Predicting");

        let result = self.predict_inner(model_name, data).await;
        self.finish("predict", model_name, started, result)
    }

    async fn predict_inner(&self, model_name: &str, data: DataTable) -> Result<Vec<Label>, DomainError> {
        let name = ModelName::parse(model_name)?;
        let features = data.into_feature_matrix()?;
        let estimator = self.store.load(&name).await?;

        self.run_job(move || Ok(estimator.predict(&features)?)).await
    }

    /// Delete a stored model
    pub async fn delete(&self, model_name: &str) -> Result<(), DomainError> {
        let started = Instant::now();
        info!(model_name = %model_name, "Deleting model");

        let result = match ModelName::parse(model_name) {
            Ok(name) => self.store.delete(&name).await,
            Err(e) => Err(e),
        };
        self.finish("delete", model_name, started, result)
    }

    /// Whether the tag names a registered model type (case-sensitive)
    pub fn is_supported(&self, model_type: &str) -> bool {
        self.registry.is_supported(model_type)
    }

    /// Registered model types in registration order
    pub fn model_types(&self) -> Vec<ModelTypeInfo> {
        self.registry.model_types()
    }

    /// Check the storage backend
    pub async fn backend_health(&self) -> BackendHealth {
        let started = Instant::now();
        let result = self.store.ping().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => BackendHealth {
                name: self.store.backend_name().to_string(),
                healthy: true,
                latency_ms,
                message: None,
            },
            Err(e) => {
                warn!(error = %e, "Storage backend check failed");
                BackendHealth {
                    name: self.store.backend_name().to_string(),
                    healthy: false,
                    latency_ms,
                    message: Some(e.to_string()),
                }
            }
        }
    }
}
