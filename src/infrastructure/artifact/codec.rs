//! Artifact encoding
//!
//! Layout: the 4-byte magic `MLSA` followed by a bincode envelope whose first
//! field is the little-endian `u16` format version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ModelArtifact};
use crate::infrastructure::estimator::EstimatorHandle;

const MAGIC: &[u8; 4] = b"MLSA";
pub const FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u16,
    model_type: &'a str,
    trained_at: DateTime<Utc>,
    estimator: &'a EstimatorHandle,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u16,
    model_type: String,
    trained_at: DateTime<Utc>,
    estimator: EstimatorHandle,
}

/// Decoded artifact contents
#[derive(Debug, Clone)]
pub struct StoredModel {
    pub model_type: String,
    pub trained_at: DateTime<Utc>,
    pub estimator: EstimatorHandle,
}

/// Serialize an estimator into a storable artifact
pub fn encode(estimator: &EstimatorHandle) -> Result<ModelArtifact, DomainError> {
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        model_type: estimator.model_type(),
        trained_at: Utc::now(),
        estimator,
    };

    let body = bincode::serialize(&envelope)
        .map_err(|e| DomainError::serialization(format!("Failed to encode artifact: {}", e)))?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&body);

    Ok(ModelArtifact::new(estimator.model_type(), bytes))
}

/// Parse artifact bytes, checking magic, version and type tag
pub fn decode(bytes: &[u8]) -> Result<StoredModel, DomainError> {
    let body = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| DomainError::serialization("Not a model artifact (bad magic)"))?;

    let version = body
        .get(..2)
        .map(|v| u16::from_le_bytes([v[0], v[1]]))
        .ok_or_else(|| DomainError::serialization("Truncated model artifact"))?;
    if version != FORMAT_VERSION {
        return Err(DomainError::serialization(format!(
            "Unsupported artifact format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let envelope: Envelope = bincode::deserialize(body)
        .map_err(|e| DomainError::serialization(format!("Failed to decode artifact: {}", e)))?;

    if envelope.model_type != envelope.estimator.model_type() {
        return Err(DomainError::serialization(format!(
            "Artifact declares type '{}' but contains '{}'",
            envelope.model_type,
            envelope.estimator.model_type()
        )));
    }

    debug_assert_eq!(envelope.format_version, version);

    Ok(StoredModel {
        model_type: envelope.model_type,
        trained_at: envelope.trained_at,
        estimator: envelope.estimator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BackendErrorKind, Estimator, EstimatorParams, FeatureMatrix, Label, TrainingSet,
    };
    use crate::infrastructure::estimator::EstimatorRegistry;

    fn fitted(tag: &str) -> EstimatorHandle {
        let params = EstimatorParams::new().with("random_state", 3);
        let params = if tag == "RandomForest" {
            params.with("n_estimators", 4)
        } else {
            params
        };
        let mut estimator = EstimatorRegistry::with_defaults()
            .construct(tag, &params)
            .unwrap();

        let data = TrainingSet::new(
            FeatureMatrix::from_rows(vec![vec![0.0], vec![0.2], vec![3.0], vec![3.3]]).unwrap(),
            vec![Label::Int(0), Label::Int(0), Label::Int(1), Label::Int(1)],
        )
        .unwrap();
        estimator.fit(&data).unwrap();
        estimator
    }

    fn assert_serialization_error(result: Result<StoredModel, DomainError>) {
        match result {
            Err(DomainError::Backend { kind, .. }) => {
                assert_eq!(kind, BackendErrorKind::Serialization)
            }
            other => panic!("Expected serialization error, got {:?}", other.map(|m| m.model_type)),
        }
    }

    #[test]
    fn test_encoded_artifact_starts_with_magic() {
        let artifact = encode(&fitted("SVC")).unwrap();
        assert_eq!(artifact.model_type(), "SVC");
        assert_eq!(&artifact.bytes()[..4], b"MLSA");
        assert_eq!(&artifact.bytes()[4..6], &FORMAT_VERSION.to_le_bytes());
    }

    #[test]
    fn test_decoded_estimator_predicts_like_original() {
        for tag in ["SVC", "RandomForest"] {
            let original = fitted(tag);
            let artifact = encode(&original).unwrap();
            let stored = decode(artifact.bytes()).unwrap();

            assert_eq!(stored.model_type, tag);
            let queries = FeatureMatrix::from_rows(vec![vec![0.1], vec![3.1]]).unwrap();
            assert_eq!(
                stored.estimator.predict(&queries).unwrap(),
                original.predict(&queries).unwrap()
            );
        }
    }

    #[test]
    fn test_bad_magic_rejected() {
        assert_serialization_error(decode(b"PK\x03\x04garbage"));
    }

    #[test]
    fn test_future_version_rejected() {
        let artifact = encode(&fitted("SVC")).unwrap();
        let mut bytes = artifact.bytes().to_vec();
        bytes[4] = 9;
        assert_serialization_error(decode(&bytes));
    }

    #[test]
    fn test_truncated_body_rejected() {
        let artifact = encode(&fitted("RandomForest")).unwrap();
        let bytes = &artifact.bytes()[..artifact.len() / 2];
        assert_serialization_error(decode(bytes));
    }
}
