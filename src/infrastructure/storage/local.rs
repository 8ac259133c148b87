//! Local filesystem storage backend

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{DomainError, StorageBackend};

/// Local backend configuration
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub root_dir: PathBuf,
}

impl LocalConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Stores blobs as files below a root directory
///
/// Writes go to a temporary file in the destination directory which is then
/// renamed over the target, so readers never see a partially written file.
/// A write whose caller has gone away is discarded instead of renamed.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            root: config.root_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative key below the root, rejecting anything that could escape it
    fn resolve(&self, key: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(key);

        if key.is_empty() || relative.is_absolute() {
            return Err(DomainError::invalid_params(format!(
                "Invalid storage key '{}'",
                key
            )));
        }

        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(DomainError::invalid_params(format!(
                    "Invalid storage key '{}'",
                    key
                )));
            }
        }

        Ok(self.root.join(relative))
    }
}

fn io_error(op: &str, path: &Path, e: io::Error) -> DomainError {
    if e.kind() == io::ErrorKind::NotFound {
        DomainError::not_found(format!("'{}' does not exist", path.display()))
    } else {
        DomainError::io(format!("Failed to {} '{}': {}", op, path.display(), e))
    }
}

/// Shared between a pending write and the future awaiting it
///
/// The rename runs under the lock and only while the gate is open; closing
/// waits for a rename already in progress.
#[derive(Debug, Default)]
struct PublishGate {
    closed: Mutex<bool>,
}

impl PublishGate {
    fn close(&self) {
        *self.closed.lock().unwrap_or_else(|p| p.into_inner()) = true;
    }
}

/// Closes the gate when the awaiting future completes or is dropped
struct CloseOnDrop(Arc<PublishGate>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Returns whether the blob was published
fn write_atomically(path: &Path, bytes: &[u8], gate: &PublishGate) -> io::Result<bool> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "key has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    let closed = gate.closed.lock().unwrap_or_else(|p| p.into_inner());
    if *closed {
        return Ok(false);
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(true)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), DomainError> {
        let path = self.resolve(key)?;
        let target = path.clone();

        let gate = Arc::new(PublishGate::default());
        let _close = CloseOnDrop(Arc::clone(&gate));

        tokio::task::spawn_blocking(move || write_atomically(&target, &bytes, &gate))
            .await
            .map_err(|e| DomainError::io(format!("Write task failed: {}", e)))?
            .map_err(|e| io_error("write", &path, e))?;

        debug!(path = %path.display(), "Wrote blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, DomainError> {
        let path = self.resolve(key)?;

        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| io_error("read", &path, e))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let path = self.resolve(key)?;

        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error("stat", &path, e))
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let path = self.resolve(key)?;

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error("remove", &path, e))?;

        debug!(path = %path.display(), "Removed blob");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn backend() -> (TempDir, LocalBackend) {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(&LocalConfig::new(dir.path()));
        (dir, backend)
    }

    #[tokio::test]
    async fn test_put_creates_directories_and_get_reads_back() {
        let (dir, backend) = backend();

        backend
            .put("models/m1.model", Bytes::from_static(b"payload"))
            .await
            .unwrap();

        assert!(dir.path().join("models/m1.model").is_file());
        let bytes = backend.get("models/m1.model").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let (dir, backend) = backend();

        backend.put("models/a.model", Bytes::from_static(b"1")).await.unwrap();
        backend.put("models/a.model", Bytes::from_static(b"2")).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("models"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.model")]);
        assert_eq!(
            backend.get("models/a.model").await.unwrap(),
            Bytes::from_static(b"2")
        );
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let (_dir, backend) = backend();

        assert!(!backend.exists("models/none.model").await.unwrap());
        assert!(backend.get("models/none.model").await.unwrap_err().is_not_found());
        assert!(backend.remove("models/none.model").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let (_dir, backend) = backend();

        backend.put("m.model", Bytes::from_static(b"x")).await.unwrap();
        assert!(backend.exists("m.model").await.unwrap());

        backend.remove("m.model").await.unwrap();
        assert!(!backend.exists("m.model").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_escaping_root_rejected() {
        let (_dir, backend) = backend();

        for key in ["../outside", "/etc/passwd", "", "models/../../x"] {
            let err = backend.get(key).await.unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidParams { .. }),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_closed_gate_discards_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models/m1.model");
        let gate = PublishGate::default();
        gate.close();

        let published = write_atomically(&path, b"late", &gate).unwrap();

        assert!(!published);
        assert!(!path.exists());
        let entries = std::fs::read_dir(dir.path().join("models")).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[tokio::test]
    async fn test_dropped_put_does_not_publish_later() {
        let (dir, backend) = backend();

        let put = backend.put("models/m1.model", Bytes::from(vec![7u8; 4 * 1024 * 1024]));
        // dropped after its first poll, while the write is in flight
        let _ = tokio::time::timeout(Duration::from_nanos(1), put).await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        let published = backend.exists("models/m1.model").await.unwrap();
        let leftovers = std::fs::read_dir(dir.path().join("models"))
            .map(|entries| entries.count())
            .unwrap_or(0);

        // either the write finished before the drop or it left nothing behind
        assert_eq!(leftovers, usize::from(published));
    }
}
