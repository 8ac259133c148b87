//! Estimator domain - The fit/predict capability and its parameters

mod error;
mod estimator;
mod params;

pub use error::EstimatorError;
pub use estimator::Estimator;
pub use params::EstimatorParams;
