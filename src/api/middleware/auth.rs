//! HTTP Basic authentication middleware

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Expected Basic credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        // evaluate both so timing does not reveal which half failed
        let user_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let pass_ok = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        user_ok & pass_ok
    }
}

/// Reject requests without valid Basic credentials when auth is configured
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.credentials.as_deref() {
        let (username, password) = extract_basic_credentials(request.headers())?;

        if !expected.matches(&username, &password) {
            debug!(username = %username, "Rejected Basic credentials");
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
    }

    Ok(next.run(request).await)
}

fn extract_basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Basic credentials required"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header encoding"))?;

    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| ApiError::unauthorized("Basic credentials required"))?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ApiError::unauthorized("Malformed Basic credentials"))?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| ApiError::unauthorized("Malformed Basic credentials"))?;

    Ok((username.to_string(), password.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
