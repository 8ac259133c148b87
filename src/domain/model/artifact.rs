//! Serialized model artifact

use bytes::Bytes;

/// Serialized bytes of a trained estimator together with its type tag
///
/// Produced by the artifact codec and handed to a storage backend; callers of
/// the artifact store never see backend internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    model_type: String,
    bytes: Bytes,
}

impl ModelArtifact {
    pub fn new(model_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            model_type: model_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
