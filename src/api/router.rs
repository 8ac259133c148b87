use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{basic_auth_middleware, logging_middleware, metrics_middleware};
use super::models;
use super::state::AppState;
use crate::infrastructure::observability::{PrometheusMetrics, create_metrics_router};

/// Upper bound on multipart request bodies
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Create the REST router; every path is also served with a trailing slash
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/train", post(models::train))
        .route("/train/", post(models::train))
        .route("/retrain", post(models::retrain))
        .route("/retrain/", post(models::retrain))
        .route("/predict", post(models::predict))
        .route("/predict/", post(models::predict))
        .route("/delete_model", delete(models::delete_model))
        .route("/delete_model/", delete(models::delete_model))
        .route("/model-types", get(models::model_types))
        .route("/model-types/", get(models::model_types))
        .route("/healthcheck", get(health::healthcheck))
        .route("/healthcheck/", get(health::healthcheck))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            basic_auth_middleware,
        ))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

/// REST router plus the Prometheus scrape endpoint when metrics are enabled
pub fn create_router_with_metrics(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let router = create_router(state);

    match metrics {
        Some(metrics) => router.merge(create_metrics_router(metrics, metrics_path)),
        None => router,
    }
}
