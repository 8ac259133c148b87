//! Domain layer - Core types and capabilities

pub mod dataset;
pub mod error;
pub mod estimator;
pub mod model;
pub mod storage;

pub use dataset::{DataTable, FeatureMatrix, Label, TrainingSet};
pub use error::{BackendErrorKind, DomainError};
pub use estimator::{Estimator, EstimatorError, EstimatorParams};
pub use model::{validate_model_name, ModelArtifact, ModelName, ModelNameError};
pub use storage::StorageBackend;
