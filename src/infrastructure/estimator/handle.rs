//! Concrete estimator variants

use serde::{Deserialize, Serialize};

use crate::domain::{Estimator, EstimatorError, FeatureMatrix, Label, TrainingSet};

use super::random_forest::RandomForestClassifier;
use super::svc::SvcClassifier;

pub const SVC_TAG: &str = "SVC";
pub const RANDOM_FOREST_TAG: &str = "RandomForest";

/// A fitted (or freshly constructed) estimator of one of the supported types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EstimatorHandle {
    Svc(SvcClassifier),
    RandomForest(RandomForestClassifier),
}

impl EstimatorHandle {
    /// Registry tag of the variant
    pub fn model_type(&self) -> &'static str {
        match self {
            Self::Svc(_) => SVC_TAG,
            Self::RandomForest(_) => RANDOM_FOREST_TAG,
        }
    }
}

impl Estimator for EstimatorHandle {
    fn fit(&mut self, data: &TrainingSet) -> Result<(), EstimatorError> {
        match self {
            Self::Svc(svc) => svc.fit(data),
            Self::RandomForest(forest) => forest.fit(data),
        }
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, EstimatorError> {
        match self {
            Self::Svc(svc) => svc.predict(features),
            Self::RandomForest(forest) => forest.predict(features),
        }
    }
}

impl From<SvcClassifier> for EstimatorHandle {
    fn from(svc: SvcClassifier) -> Self {
        Self::Svc(svc)
    }
}

impl From<RandomForestClassifier> for EstimatorHandle {
    fn from(forest: RandomForestClassifier) -> Self {
        Self::RandomForest(forest)
    }
}
