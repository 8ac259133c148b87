//! Artifact store - named model artifacts on a storage backend

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{DomainError, ModelName, StorageBackend};
use crate::infrastructure::estimator::EstimatorHandle;

use super::codec::{self, StoredModel};
use super::locks::NameLocks;

/// Default bound on a single backend call
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps model names to backend keys: `<models_dir>/<name>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    models_dir: String,
    extension: String,
}

impl ArtifactLayout {
    pub fn new(models_dir: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            models_dir: models_dir.into().trim_matches('/').to_string(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn key(&self, name: &ModelName) -> String {
        let file = if self.extension.is_empty() {
            name.as_str().to_string()
        } else {
            format!("{}.{}", name, self.extension)
        };

        if self.models_dir.is_empty() {
            file
        } else {
            format!("{}/{}", self.models_dir, file)
        }
    }

    /// Key checked by health checks; never a valid model name
    pub fn health_key(&self) -> String {
        if self.models_dir.is_empty() {
            ".healthcheck".to_string()
        } else {
            format!("{}/.healthcheck", self.models_dir)
        }
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new("models", "model")
    }
}

/// Save, load, delete and retrain named artifacts
///
/// Mutations of a name hold its exclusive lock; reads hold the shared lock.
/// Every backend call is bounded by the configured I/O timeout.
#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn StorageBackend>,
    locks: NameLocks,
    layout: ArtifactLayout,
    io_timeout: Duration,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("backend", &self.backend.backend_name())
            .field("layout", &self.layout)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

impl ArtifactStore {
    pub fn new(backend: Arc<dyn StorageBackend>, layout: ArtifactLayout) -> Self {
        Self {
            backend,
            locks: NameLocks::new(),
            layout,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    async fn bounded<T>(
        &self,
        op: &str,
        key: &str,
        call: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.io_timeout, call)
            .await
            .map_err(|_| {
                DomainError::timeout(format!(
                    "{} of '{}' did not finish within {:?}",
                    op, key, self.io_timeout
                ))
            })?
    }

    async fn put_unlocked(&self, key: &str, estimator: &EstimatorHandle) -> Result<(), DomainError> {
        let artifact = codec::encode(estimator)?;
        let size = artifact.len();

        self.bounded("put", key, self.backend.put(key, artifact.into_bytes()))
            .await?;

        debug!(key = %key, size = size, "Stored artifact");
        Ok(())
    }

    async fn get_unlocked(&self, key: &str) -> Result<StoredModel, DomainError> {
        let bytes = self.bounded("get", key, self.backend.get(key)).await?;
        codec::decode(&bytes)
    }

    /// Write the estimator under `name`, replacing any previous artifact
    pub async fn save(&self, name: &ModelName, estimator: &EstimatorHandle) -> Result<(), DomainError> {
        let key = self.layout.key(name);
        let _guard = self.locks.write(name.as_str()).await;

        self.put_unlocked(&key, estimator).await
    }

    /// Read and decode the artifact stored under `name`
    pub async fn load(&self, name: &ModelName) -> Result<EstimatorHandle, DomainError> {
        self.load_stored(name).await.map(|stored| stored.estimator)
    }

    /// Like `load`, keeping the artifact metadata
    pub async fn load_stored(&self, name: &ModelName) -> Result<StoredModel, DomainError> {
        let key = self.layout.key(name);
        let _guard = self.locks.read(name.as_str()).await;

        self.get_unlocked(&key).await.map_err(|e| match e {
            DomainError::NotFound { .. } => {
                DomainError::not_found(format!("Model '{}' not found", name))
            }
            other => other,
        })
    }

    /// Whether an artifact exists; backend failures count as absent
    pub async fn exists(&self, name: &ModelName) -> bool {
        let key = self.layout.key(name);
        let _guard = self.locks.read(name.as_str()).await;

        match self.bounded("exists", &key, self.backend.exists(&key)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(model_name = %name, error = %e, "Existence check failed");
                false
            }
        }
    }

    /// Remove the artifact stored under `name`
    pub async fn delete(&self, name: &ModelName) -> Result<(), DomainError> {
        let key = self.layout.key(name);
        let _guard = self.locks.write(name.as_str()).await;

        self.bounded("remove", &key, self.backend.remove(&key))
            .await
            .map_err(|e| match e {
                DomainError::NotFound { .. } => {
                    DomainError::not_found(format!("Model '{}' not found", name))
                }
                other => other,
            })?;

        info!(model_name = %name, "Deleted model artifact");
        Ok(())
    }

    /// Load, re-fit and save, holding the name's exclusive lock throughout
    ///
    /// `refit` receives the stored estimator and returns the fitted one, so the
    /// caller decides where the CPU-bound work runs.
    pub async fn retrain<F, Fut>(&self, name: &ModelName, refit: F) -> Result<String, DomainError>
    where
        F: FnOnce(EstimatorHandle) -> Fut,
        Fut: Future<Output = Result<EstimatorHandle, DomainError>>,
    {
        let key = self.layout.key(name);
        let _guard = self.locks.write(name.as_str()).await;

        let stored = self.get_unlocked(&key).await.map_err(|e| match e {
            DomainError::NotFound { .. } => {
                DomainError::not_found(format!("Model '{}' not found", name))
            }
            other => other,
        })?;

        let estimator = refit(stored.estimator).await?;

        self.put_unlocked(&key, &estimator).await?;
        Ok(stored.model_type)
    }

    /// Metadata check against the backend, used by health checks
    pub async fn ping(&self) -> Result<(), DomainError> {
        let key = self.layout.health_key();
        self.bounded("exists", &key, self.backend.exists(&key))
            .await
            .map(|_| ())
    }
}
