//! Infrastructure services

mod model_service;

pub use model_service::{
    BackendHealth, ModelService, TrainRequest, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MODEL_NAME,
    DEFAULT_MODEL_TYPE,
};
