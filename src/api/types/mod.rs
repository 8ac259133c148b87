//! REST request and response types

pub mod error;
pub mod models;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use models::{
    MessageResponse, ModelNameQuery, ModelTypesResponse, PredictResponse, TrainQuery,
};
