//! Estimator infrastructure - Concrete classifiers and their registry

mod handle;
mod preprocessing;
mod random_forest;
mod registry;
mod svc;
mod tree;

pub use handle::{EstimatorHandle, RANDOM_FOREST_TAG, SVC_TAG};
pub use random_forest::{ForestConfig, MaxFeatures, RandomForestClassifier};
pub use registry::{Constructor, EstimatorRegistry, ModelTypeInfo};
pub use svc::{Gamma, Kernel, SvcClassifier, SvcConfig};
