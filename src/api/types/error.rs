//! REST error types

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Error class reported in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    NotFound,
    UnsupportedType,
    InvalidParams,
    BackendError,
    AuthenticationError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::UnsupportedType => write!(f, "unsupported_type"),
            Self::InvalidParams => write!(f, "invalid_params"),
            Self::BackendError => write!(f, "backend_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                },
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidParams, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiErrorType::AuthenticationError,
            message,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFound, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let challenge = self.status == StatusCode::UNAUTHORIZED;
        let mut response = (self.status, Json(self.response)).into_response();

        if challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"model-lifecycle-service\""),
            );
        }

        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::UnsupportedType { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiErrorType::UnsupportedType,
                format!("{}; see /model-types/", err),
            ),
            DomainError::InvalidParams { .. } => Self::bad_request(err.to_string()),
            DomainError::Backend { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiErrorType::BackendError,
                err.to_string(),
            ),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_status_mapping() {
        let cases = [
            (DomainError::not_found("Model 'm1' not found"), StatusCode::NOT_FOUND, ApiErrorType::NotFound),
            (DomainError::unsupported_type("XGB"), StatusCode::BAD_REQUEST, ApiErrorType::UnsupportedType),
            (DomainError::invalid_params("bad csv"), StatusCode::BAD_REQUEST, ApiErrorType::InvalidParams),
            (DomainError::timeout("slow"), StatusCode::BAD_REQUEST, ApiErrorType::BackendError),
        ];

        for (domain_err, status, error_type) in cases {
            let api_err = ApiError::from(domain_err);
            assert_eq!(api_err.status, status);
            assert_eq!(api_err.response.error.error_type, error_type);
        }
    }

    #[test]
    fn test_not_found_keeps_message() {
        let api_err = ApiError::from(DomainError::not_found("Model 'm1' not found"));
        assert_eq!(api_err.response.error.message, "Model 'm1' not found");
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::bad_request("Missing multipart field 'file'");
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["error"]["type"], "invalid_params");
        assert_eq!(json["error"]["message"], "Missing multipart field 'file'");
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = ApiError::unauthorized("Invalid credentials").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert!(challenge.to_str().unwrap().starts_with("Basic"));
    }
}
