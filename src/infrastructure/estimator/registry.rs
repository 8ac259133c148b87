//! Estimator registry - maps model type tags to constructors

use serde::Serialize;

use crate::domain::{DomainError, EstimatorError, EstimatorParams};

use super::handle::{EstimatorHandle, RANDOM_FOREST_TAG, SVC_TAG};
use super::random_forest::RandomForestClassifier;
use super::svc::SvcClassifier;

/// Builds an unfitted estimator from request parameters
pub type Constructor = fn(&EstimatorParams) -> Result<EstimatorHandle, EstimatorError>;

/// Public description of a registered model type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelTypeInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
struct Registration {
    tag: &'static str,
    description: &'static str,
    construct: Constructor,
}

/// Closed set of model types, in registration order
#[derive(Debug, Clone, Default)]
pub struct EstimatorRegistry {
    entries: Vec<Registration>,
}

impl EstimatorRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `SVC` and `RandomForest`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            SVC_TAG,
            "Support vector classifier (kernel SVM, one-vs-rest for multiclass)",
            |params| SvcClassifier::from_params(params).map(EstimatorHandle::from),
        );
        registry.register(
            RANDOM_FOREST_TAG,
            "Random forest of Gini decision trees with bootstrap sampling",
            |params| RandomForestClassifier::from_params(params).map(EstimatorHandle::from),
        );
        registry
    }

    /// Registers a type; a tag registered twice keeps its original position
    /// and takes the new constructor
    pub fn register(&mut self, tag: &'static str, description: &'static str, construct: Constructor) {
        let registration = Registration {
            tag,
            description,
            construct,
        };

        match self.entries.iter_mut().find(|entry| entry.tag == tag) {
            Some(existing) => *existing = registration,
            None => self.entries.push(registration),
        }
    }

    /// Whether the tag names a registered type
    pub fn is_supported(&self, tag: &str) -> bool {
        self.entries.iter().any(|entry| entry.tag == tag)
    }

    /// Construct an unfitted estimator
    pub fn construct(
        &self,
        tag: &str,
        params: &EstimatorParams,
    ) -> Result<EstimatorHandle, DomainError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.tag == tag)
            .ok_or_else(|| DomainError::unsupported_type(tag))?;

        Ok((entry.construct)(params)?)
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.tag).collect()
    }

    pub fn model_types(&self) -> Vec<ModelTypeInfo> {
        self.entries
            .iter()
            .map(|entry| ModelTypeInfo {
                name: entry.tag.to_string(),
                description: entry.description.to_string(),
            })
            .collect()
    }
}
