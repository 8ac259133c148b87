//! Artifact infrastructure - Encoding, per-name locking and the artifact store

pub mod codec;
mod locks;
mod store;

pub use codec::StoredModel;
pub use locks::{NameGuard, NameLocks};
pub use store::{ArtifactLayout, ArtifactStore, DEFAULT_IO_TIMEOUT};
