//! Infrastructure layer - storage, estimators and the model service

pub mod artifact;
pub mod dataset;
pub mod estimator;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
