//! Estimator errors

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while constructing, fitting or applying an estimator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EstimatorError {
    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("estimator has not been fitted")]
    NotFitted,
}

impl EstimatorError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

impl From<EstimatorError> for DomainError {
    fn from(err: EstimatorError) -> Self {
        DomainError::invalid_params(err.to_string())
    }
}
