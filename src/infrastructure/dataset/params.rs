//! Hyperparameter document decoding

use crate::domain::{DomainError, EstimatorParams};

/// Decode a UTF-8 JSON parameter document; empty or `null` is an empty mapping
pub fn parse_params(bytes: &[u8]) -> Result<EstimatorParams, DomainError> {
    let raw = std::str::from_utf8(bytes)
        .map_err(|e| DomainError::invalid_params(format!("Parameters are not UTF-8: {}", e)))?;

    Ok(EstimatorParams::from_json(raw)?)
}
