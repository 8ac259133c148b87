//! Storage domain - Pluggable blob backends

mod backend;

pub use backend::StorageBackend;

#[cfg(test)]
pub use backend::MockStorageBackend;
