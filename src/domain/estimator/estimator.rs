//! Estimator capability

use crate::domain::dataset::{FeatureMatrix, Label, TrainingSet};

use super::error::EstimatorError;

/// A trainable classifier
///
/// `fit` replaces any previously learned state; hyperparameters are kept.
pub trait Estimator: Send + Sync {
    fn fit(&mut self, data: &TrainingSet) -> Result<(), EstimatorError>;

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, EstimatorError>;
}
