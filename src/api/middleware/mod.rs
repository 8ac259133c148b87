//! API middleware components

pub mod auth;
pub mod logging;
pub mod metrics;

pub use auth::{BasicCredentials, basic_auth_middleware};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
