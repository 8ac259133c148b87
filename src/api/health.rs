//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use super::state::AppState;
use crate::infrastructure::services::BackendHealth;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub backend: BackendCheck,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Storage backend check as reported to clients
#[derive(Debug, Serialize)]
pub struct BackendCheck {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<BackendHealth> for BackendCheck {
    fn from(health: BackendHealth) -> Self {
        Self {
            name: health.name,
            status: if health.healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            latency_ms: health.latency_ms,
            message: health.message,
        }
    }
}

/// GET /healthcheck
///
/// Always 200 while the process serves requests; a failing backend check
/// only downgrades the status to `degraded`.
pub async fn healthcheck(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = BackendCheck::from(state.model_service.backend_health().await);

    Json(HealthResponse {
        status: backend.status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_check_is_degraded() {
        let check = BackendCheck::from(BackendHealth {
            name: "object_store".to_string(),
            healthy: false,
            latency_ms: 12,
            message: Some("connection refused".to_string()),
        });

        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["message"], "connection refused");
    }

    #[test]
    fn test_healthy_check_omits_message() {
        let check = BackendCheck::from(BackendHealth {
            name: "local".to_string(),
            healthy: true,
            latency_ms: 0,
            message: None,
        });

        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("message"));
    }
}
