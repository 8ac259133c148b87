use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::storage::{BackendConfig, BackendType, ObjectStoreConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub workers: WorkersConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub grpc_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Also append log lines to this file
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: String,
    pub models_dir: String,
    pub artifact_extension: String,
    pub io_timeout_secs: u64,
    pub local: LocalStorageConfig,
    pub object_store: ObjectStoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSettings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: String,
    pub key_prefix: String,
    pub region: String,
    pub temp_dir: PathBuf,
    pub force_path_style: bool,
}

/// HTTP Basic credentials for the REST surface; disabled unless both are set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub max_concurrent_jobs: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            grpc_port: 50051,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            models_dir: "models".to_string(),
            artifact_extension: "model".to_string(),
            io_timeout_secs: 30,
            local: LocalStorageConfig::default(),
            object_store: ObjectStoreSettings::default(),
        }
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
        }
    }
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket: String::new(),
            key_prefix: String::new(),
            region: "us-east-1".to_string(),
            temp_dir: PathBuf::from("temp_buffer"),
            force_path_style: true,
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl AuthConfig {
    /// Username and password when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl StorageConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }

    /// Static backend description for the storage factory
    pub fn backend_config(&self) -> Result<BackendConfig, String> {
        let backend_type = BackendType::from_str(&self.backend)
            .ok_or_else(|| format!("Unknown storage backend '{}'", self.backend))?;

        Ok(match backend_type {
            BackendType::Local => BackendConfig::local(self.local.root_dir.clone()),
            BackendType::ObjectStore => {
                let settings = &self.object_store;
                let mut cfg = ObjectStoreConfig::new(&settings.bucket)
                    .with_key_prefix(&settings.key_prefix)
                    .with_temp_dir(settings.temp_dir.clone());
                cfg.region = settings.region.clone();
                cfg.force_path_style = settings.force_path_style;
                if let Some(endpoint) = settings.endpoint.as_deref().filter(|e| !e.is_empty()) {
                    cfg = cfg.with_endpoint(endpoint);
                }
                if let (Some(access), Some(secret)) =
                    (settings.access_key.as_deref(), settings.secret_key.as_deref())
                {
                    cfg = cfg.with_credentials(access, secret);
                }
                BackendConfig::object_store(cfg)
            }
            BackendType::InMemory => BackendConfig::in_memory(),
        })
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local`, an optional explicit file
    /// and `APP__`-prefixed environment variables, in that order
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
