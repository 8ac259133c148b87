//! API layer - REST endpoints and middleware

pub mod health;
pub mod middleware;
pub mod models;
pub mod router;
pub mod state;
pub mod types;

pub use router::{MAX_UPLOAD_BYTES, create_router, create_router_with_metrics};
pub use state::{AppState, ModelServiceTrait};
