mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, LocalStorageConfig, LogFormat, LoggingConfig, MetricsConfig,
    ObjectStoreSettings, ServerConfig, StorageConfig, WorkersConfig,
};
