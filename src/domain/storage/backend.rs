//! Storage backend trait definition

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Blob storage medium keyed by relative, `/`-separated paths
///
/// Implementations do not retry; retry policy belongs to the caller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Writes the blob so that readers observe either the old or the new bytes
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), DomainError>;

    /// Reads the blob, failing with `NotFound` when absent
    async fn get(&self, key: &str) -> Result<Bytes, DomainError>;

    /// Metadata check; never fetches the blob
    async fn exists(&self, key: &str) -> Result<bool, DomainError>;

    /// Removes the blob, failing with `NotFound` when absent
    async fn remove(&self, key: &str) -> Result<(), DomainError>;

    /// Short name used in logs and health output
    fn backend_name(&self) -> &'static str;
}
