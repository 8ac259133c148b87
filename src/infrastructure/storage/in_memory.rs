//! In-memory storage backend

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{DomainError, StorageBackend};

/// Thread-safe in-memory blob backend
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with blobs
    pub fn with_blobs(blobs: Vec<(String, Bytes)>) -> Self {
        Self {
            blobs: RwLock::new(blobs.into_iter().collect()),
        }
    }

    /// Returns the stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

fn poisoned(e: impl std::fmt::Display) -> DomainError {
    DomainError::io(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), DomainError> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, DomainError> {
        let blobs = self.blobs.read().map_err(poisoned)?;

        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Blob '{}' not found", key)))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs.contains_key(key))
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;

        blobs
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("Blob '{}' not found", key)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = InMemoryBackend::new();
        backend
            .put("models/a.model", Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let bytes = backend.get("models/a.model").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend.get("models/missing.model").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let backend = InMemoryBackend::new();
        backend.put("k", Bytes::from_static(b"one")).await.unwrap();
        backend.put("k", Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(backend.get("k").await.unwrap(), Bytes::from_static(b"two"));
        assert_eq!(backend.keys(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_remove() {
        let backend = InMemoryBackend::with_blobs(vec![("k".into(), Bytes::from_static(b"x"))]);

        backend.remove("k").await.unwrap();
        assert!(!backend.exists("k").await.unwrap());

        let err = backend.remove("k").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
