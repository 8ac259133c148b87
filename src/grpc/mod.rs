//! RPC layer - tonic service over the generated `model_service` package

pub mod proto {
    tonic::include_proto!("model_service");
}

mod service;

pub use service::{ModelServiceGrpc, status_from_domain};
