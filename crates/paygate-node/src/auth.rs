//! API token authentication for the paylink routes.
//!
//! Accepted headers:
//! ```text
//! X-Api-Key: <token>
//! Authorization: Bearer <token>
//! ```
//! The webhook route authenticates through its path secret instead and is
//! not behind this middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Extract the presented token, if any.
fn presented_token(request: &Request) -> Option<&str> {
    if let Some(key) = request.headers().get(API_KEY_HEADER) {
        return key.to_str().ok();
    }
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Constant-time comparison so the token cannot be guessed byte by byte.
pub fn token_matches(expected: &str, presented: &str) -> bool {
    if expected.is_empty() || expected.len() != presented.len() {
        return false;
    }
    expected
        .bytes()
        .zip(presented.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match presented_token(&request) {
        Some(token) if token_matches(&state.api_token, token) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "invalid api token");
            ApiError::unauthorized("invalid api token").into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "anonymous access attempt");
            ApiError::unauthorized("you must be logged in for this operation").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "secreT"));
        assert!(!token_matches("secret", "secret2"));
        assert!(!token_matches("", ""));
    }
}
