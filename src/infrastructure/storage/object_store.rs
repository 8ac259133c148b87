//! S3-compatible object store backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3SdkClient;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::{DomainError, StorageBackend};

/// Object store connection settings
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Endpoint of an S3-compatible service; `None` uses the AWS default
    pub endpoint: Option<String>,
    pub bucket: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Prepended to every key
    pub key_prefix: String,
    /// Directory for staging files during transfers
    pub temp_dir: PathBuf,
    pub force_path_style: bool,
}

impl ObjectStoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            key_prefix: String::new(),
            temp_dir: std::env::temp_dir(),
            force_path_style: true,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Endpoint with a scheme; bare `host:port` values are treated as plain HTTP
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.contains("://") {
                endpoint.clone()
            } else {
                format!("http://{}", endpoint)
            }
        })
    }
}

/// Object store client operations (for mocking)
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + std::fmt::Debug {
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), DomainError>;

    /// Fails with `NotFound` when the object does not exist
    async fn download_file(&self, bucket: &str, key: &str, path: &Path)
        -> Result<(), DomainError>;

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, DomainError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), DomainError>;
}

/// Real S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Client {
    client: S3SdkClient,
}

impl S3Client {
    pub fn new(client: S3SdkClient) -> Self {
        Self { client }
    }

    pub fn from_conf(config: aws_sdk_s3::Config) -> Self {
        Self::new(S3SdkClient::from_conf(config))
    }

    /// Build a client from the default AWS chain plus explicit overrides
    pub async fn connect(config: &ObjectStoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }

        if let Some(endpoint) = config.endpoint_url() {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self::from_conf(s3_config)
    }
}

fn s3_error(op: &str, key: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::io(format!("Object store {} of '{}' failed: {}", op, key, e))
}

#[async_trait]
impl ObjectStoreClient for S3Client {
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), DomainError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| s3_error("upload", key, e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| s3_error("upload", key, aws_sdk_s3::error::DisplayErrorContext(e)))?;

        Ok(())
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), DomainError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);

                if missing {
                    DomainError::not_found(format!("Object '{}' not found", key))
                } else {
                    s3_error("download", key, aws_sdk_s3::error::DisplayErrorContext(e))
                }
            })?;

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| s3_error("download", key, e))?;
        let mut body = output.body;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| s3_error("download", key, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| s3_error("download", key, e))?;
        }

        file.flush().await.map_err(|e| s3_error("download", key, e))?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, DomainError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);

                if missing {
                    Ok(false)
                } else {
                    Err(s3_error("head", key, aws_sdk_s3::error::DisplayErrorContext(e)))
                }
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), DomainError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error("delete", key, aws_sdk_s3::error::DisplayErrorContext(e)))?;

        Ok(())
    }
}

/// Stores blobs as objects in a single bucket, staging transfers through
/// temporary files
#[derive(Debug)]
pub struct ObjectStoreBackend<C: ObjectStoreClient = S3Client> {
    client: C,
    bucket: String,
    key_prefix: String,
    temp_dir: PathBuf,
}

impl ObjectStoreBackend<S3Client> {
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self, DomainError> {
        let client = S3Client::connect(config).await;
        Self::with_client(client, config)
    }
}

impl<C: ObjectStoreClient> ObjectStoreBackend<C> {
    pub fn with_client(client: C, config: &ObjectStoreConfig) -> Result<Self, DomainError> {
        if config.bucket.trim().is_empty() {
            return Err(DomainError::invalid_params(
                "Object store bucket name must not be empty",
            ));
        }

        std::fs::create_dir_all(&config.temp_dir).map_err(|e| {
            DomainError::io(format!(
                "Failed to create temp directory '{}': {}",
                config.temp_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.trim_matches('/').to_string(),
            temp_dir: config.temp_dir.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.key_prefix, key)
        }
    }

    fn temp_file(&self) -> Result<NamedTempFile, DomainError> {
        NamedTempFile::new_in(&self.temp_dir)
            .map_err(|e| DomainError::io(format!("Failed to create temp file: {}", e)))
    }
}

#[async_trait]
impl<C: ObjectStoreClient> StorageBackend for ObjectStoreBackend<C> {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), DomainError> {
        let object_key = self.object_key(key);
        let staged = self.temp_file()?;
        let stage_error = |e: std::io::Error| DomainError::io(format!("Failed to stage upload: {}", e));

        // `staged` keeps ownership of the path and removes it on every exit
        let mut file = staged
            .as_file()
            .try_clone()
            .map(tokio::fs::File::from_std)
            .map_err(stage_error)?;
        file.write_all(&bytes).await.map_err(stage_error)?;
        file.flush().await.map_err(stage_error)?;
        drop(file);

        self.client
            .upload_file(&self.bucket, &object_key, staged.path())
            .await?;

        debug!(bucket = %self.bucket, key = %object_key, size = bytes.len(), "Uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, DomainError> {
        let object_key = self.object_key(key);
        let staged = self.temp_file()?;

        self.client
            .download_file(&self.bucket, &object_key, staged.path())
            .await?;

        tokio::fs::read(staged.path())
            .await
            .map(Bytes::from)
            .map_err(|e| DomainError::io(format!("Failed to read staged download: {}", e)))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        self.client
            .head_object(&self.bucket, &self.object_key(key))
            .await
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let object_key = self.object_key(key);

        // S3 deletes succeed for missing keys
        if !self.client.head_object(&self.bucket, &object_key).await? {
            return Err(DomainError::not_found(format!(
                "Object '{}' not found",
                object_key
            )));
        }

        self.client.delete_object(&self.bucket, &object_key).await?;
        debug!(bucket = %self.bucket, key = %object_key, "Deleted object");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "object_store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct MockObjectClient {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    }

    #[async_trait]
    impl ObjectStoreClient for MockObjectClient {
        async fn upload_file(
            &self,
            bucket: &str,
            key: &str,
            path: &Path,
        ) -> Result<(), DomainError> {
            let data = std::fs::read(path).unwrap();
            self.objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), data);
            Ok(())
        }

        async fn download_file(
            &self,
            bucket: &str,
            key: &str,
            path: &Path,
        ) -> Result<(), DomainError> {
            let data = self
                .objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| DomainError::not_found("missing"))?;
            std::fs::write(path, data).unwrap();
            Ok(())
        }

        async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, DomainError> {
            Ok(self
                .objects
                .lock()
                .unwrap()
                .contains_key(&(bucket.to_string(), key.to_string())))
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), DomainError> {
            self.objects
                .lock()
                .unwrap()
                .remove(&(bucket.to_string(), key.to_string()));
            Ok(())
        }
    }

    fn backend(prefix: &str) -> (TempDir, ObjectStoreBackend<MockObjectClient>) {
        let dir = TempDir::new().unwrap();
        let config = ObjectStoreConfig::new("mlops")
            .with_key_prefix(prefix)
            .with_temp_dir(dir.path().join("buffer"));
        let backend = ObjectStoreBackend::with_client(MockObjectClient::default(), &config).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        let config = ObjectStoreConfig::new("b").with_endpoint("localhost:9000");
        assert_eq!(config.endpoint_url().as_deref(), Some("http://localhost:9000"));

        let config = ObjectStoreConfig::new("b").with_endpoint("https://s3.example.com");
        assert_eq!(config.endpoint_url().as_deref(), Some("https://s3.example.com"));

        assert_eq!(ObjectStoreConfig::new("b").endpoint_url(), None);
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let dir = TempDir::new().unwrap();
        let config = ObjectStoreConfig::new(" ").with_temp_dir(dir.path());
        let result = ObjectStoreBackend::with_client(MockObjectClient::default(), &config);
        assert!(matches!(result, Err(DomainError::InvalidParams { .. })));
    }

    #[tokio::test]
    async fn test_put_get_round_trip_applies_prefix() {
        let (_dir, backend) = backend("/artifacts/");

        backend
            .put("models/m1.model", Bytes::from_static(b"blob"))
            .await
            .unwrap();

        assert!(backend
            .client
            .objects
            .lock()
            .unwrap()
            .contains_key(&("mlops".to_string(), "artifacts/models/m1.model".to_string())));
        assert_eq!(
            backend.get("models/m1.model").await.unwrap(),
            Bytes::from_static(b"blob")
        );
        assert!(backend.exists("models/m1.model").await.unwrap());
    }

    #[tokio::test]
    async fn test_staging_files_are_cleaned_up() {
        let (dir, backend) = backend("");

        backend.put("a", Bytes::from_static(b"1")).await.unwrap();
        backend.get("a").await.unwrap();

        let leftover = std::fs::read_dir(dir.path().join("buffer")).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[derive(Debug, Clone, Copy)]
    enum Fault {
        Error,
        Stall,
    }

    /// Client whose transfers fail or never finish
    #[derive(Debug)]
    struct FaultyClient(Fault);

    impl FaultyClient {
        async fn fail(&self, key: &str) -> Result<(), DomainError> {
            match self.0 {
                Fault::Error => Err(DomainError::io(format!("transfer of '{}' failed", key))),
                Fault::Stall => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl ObjectStoreClient for FaultyClient {
        async fn upload_file(
            &self,
            _bucket: &str,
            key: &str,
            path: &Path,
        ) -> Result<(), DomainError> {
            assert!(path.exists());
            self.fail(key).await
        }

        async fn download_file(
            &self,
            _bucket: &str,
            key: &str,
            path: &Path,
        ) -> Result<(), DomainError> {
            std::fs::write(path, b"partial").unwrap();
            self.fail(key).await
        }

        async fn head_object(&self, _bucket: &str, _key: &str) -> Result<bool, DomainError> {
            Ok(true)
        }

        async fn delete_object(&self, _bucket: &str, _key: &str) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn faulty_backend(fault: Fault) -> (TempDir, ObjectStoreBackend<FaultyClient>) {
        let dir = TempDir::new().unwrap();
        let config = ObjectStoreConfig::new("mlops").with_temp_dir(dir.path().join("buffer"));
        let backend = ObjectStoreBackend::with_client(FaultyClient(fault), &config).unwrap();
        (dir, backend)
    }

    fn buffered_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("buffer")).unwrap().count()
    }

    #[tokio::test]
    async fn test_failed_upload_removes_staged_file() {
        let (dir, backend) = faulty_backend(Fault::Error);

        let err = backend
            .put("models/m1.model", Bytes::from_static(b"blob"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("transfer of 'models/m1.model' failed"));
        assert_eq!(buffered_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_failed_download_removes_staged_file() {
        let (dir, backend) = faulty_backend(Fault::Error);

        assert!(backend.get("models/m1.model").await.is_err());
        assert_eq!(buffered_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_timed_out_transfers_remove_staged_files() {
        use crate::domain::{
            BackendErrorKind, Estimator, EstimatorParams, FeatureMatrix, Label, ModelName,
            TrainingSet,
        };
        use crate::infrastructure::artifact::{ArtifactLayout, ArtifactStore};
        use crate::infrastructure::estimator::EstimatorRegistry;

        let (dir, backend) = faulty_backend(Fault::Stall);
        let store = ArtifactStore::new(Arc::new(backend), ArtifactLayout::default())
            .with_io_timeout(Duration::from_millis(20));
        let m1 = ModelName::new("m1").unwrap();

        let mut estimator = EstimatorRegistry::with_defaults()
            .construct(
                "RandomForest",
                &EstimatorParams::new()
                    .with("n_estimators", 2)
                    .with("random_state", 1),
            )
            .unwrap();
        estimator
            .fit(
                &TrainingSet::new(
                    FeatureMatrix::from_rows(vec![vec![0.0], vec![1.0]]).unwrap(),
                    vec![Label::Int(0), Label::Int(1)],
                )
                .unwrap(),
            )
            .unwrap();

        let is_timeout = |err: &DomainError| {
            matches!(
                err,
                DomainError::Backend {
                    kind: BackendErrorKind::Timeout,
                    ..
                }
            )
        };

        let err = store.save(&m1, &estimator).await.unwrap_err();
        assert!(is_timeout(&err), "{}", err);
        let err = store.load(&m1).await.unwrap_err();
        assert!(is_timeout(&err), "{}", err);

        assert_eq!(buffered_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (_dir, backend) = backend("");

        assert!(backend.remove("nope").await.unwrap_err().is_not_found());
        assert!(backend.get("nope").await.unwrap_err().is_not_found());

        backend.put("yes", Bytes::from_static(b"1")).await.unwrap();
        backend.remove("yes").await.unwrap();
        assert!(!backend.exists("yes").await.unwrap());
    }

    fn sdk_client(endpoint: &str) -> S3Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                "test", "test", None, None, "static",
            ))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        S3Client::from_conf(config)
    }

    #[tokio::test]
    async fn test_s3_head_object_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/mlops/models/missing.model"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/mlops/models/present.model"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = sdk_client(&server.uri());

        assert!(!client.head_object("mlops", "models/missing.model").await.unwrap());
        assert!(client.head_object("mlops", "models/present.model").await.unwrap());
    }

    #[tokio::test]
    async fn test_s3_download_writes_body_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mlops/models/m1.model"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"artifact".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("download");
        let client = sdk_client(&server.uri());

        client
            .download_file("mlops", "models/m1.model", &target)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"artifact");
    }
}
