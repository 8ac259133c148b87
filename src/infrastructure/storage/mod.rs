//! Storage infrastructure - Blob backends

mod factory;
mod in_memory;
mod local;
mod object_store;

pub use factory::{BackendConfig, BackendFactory, BackendType};
pub use in_memory::InMemoryBackend;
pub use local::{LocalBackend, LocalConfig};
pub use object_store::{ObjectStoreBackend, ObjectStoreClient, ObjectStoreConfig, S3Client};
