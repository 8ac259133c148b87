//! Backend factory for runtime storage selection

use std::sync::Arc;

use crate::domain::{DomainError, StorageBackend};

use super::in_memory::InMemoryBackend;
use super::local::{LocalBackend, LocalConfig};
use super::object_store::{ObjectStoreBackend, ObjectStoreConfig};

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Local filesystem
    Local,
    /// S3-compatible object store
    ObjectStore,
    /// In-memory storage (for testing/development)
    InMemory,
}

impl BackendType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "filesystem" | "fs" => Some(Self::Local),
            "s3" | "minio" | "object_store" | "object-store" | "objectstore" => {
                Some(Self::ObjectStore)
            }
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            _ => None,
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Local(LocalConfig),
    ObjectStore(ObjectStoreConfig),
    InMemory,
}

impl BackendConfig {
    pub fn local(root_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::Local(LocalConfig::new(root_dir))
    }

    pub fn object_store(config: ObjectStoreConfig) -> Self {
        Self::ObjectStore(config)
    }

    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Returns the backend type
    pub fn backend_type(&self) -> BackendType {
        match self {
            Self::Local(_) => BackendType::Local,
            Self::ObjectStore(_) => BackendType::ObjectStore,
            Self::InMemory => BackendType::InMemory,
        }
    }
}

/// Factory for creating storage backends
#[derive(Debug)]
pub struct BackendFactory;

impl BackendFactory {
    /// Creates a backend instance based on the configuration
    pub async fn create(config: &BackendConfig) -> Result<Arc<dyn StorageBackend>, DomainError> {
        match config {
            BackendConfig::Local(local) => Ok(Arc::new(LocalBackend::new(local))),
            BackendConfig::ObjectStore(object_store) => {
                Ok(Arc::new(ObjectStoreBackend::connect(object_store).await?))
            }
            BackendConfig::InMemory => Ok(Arc::new(InMemoryBackend::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!(BackendType::from_str("local"), Some(BackendType::Local));
        assert_eq!(BackendType::from_str("FS"), Some(BackendType::Local));
        assert_eq!(BackendType::from_str("s3"), Some(BackendType::ObjectStore));
        assert_eq!(BackendType::from_str("minio"), Some(BackendType::ObjectStore));
        assert_eq!(
            BackendType::from_str("object_store"),
            Some(BackendType::ObjectStore)
        );
        assert_eq!(BackendType::from_str("memory"), Some(BackendType::InMemory));
        assert_eq!(BackendType::from_str("postgres"), None);
    }

    #[test]
    fn test_backend_config_types() {
        assert_eq!(BackendConfig::local("/tmp").backend_type(), BackendType::Local);
        assert_eq!(BackendConfig::in_memory().backend_type(), BackendType::InMemory);
        assert_eq!(
            BackendConfig::object_store(ObjectStoreConfig::new("b")).backend_type(),
            BackendType::ObjectStore
        );
    }

    #[tokio::test]
    async fn test_create_local_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = BackendFactory::create(&BackendConfig::local(dir.path()))
            .await
            .unwrap();
        assert_eq!(backend.backend_name(), "local");
    }

    #[tokio::test]
    async fn test_create_in_memory_backend() {
        let backend = BackendFactory::create(&BackendConfig::in_memory())
            .await
            .unwrap();
        assert_eq!(backend.backend_name(), "memory");
    }
}
