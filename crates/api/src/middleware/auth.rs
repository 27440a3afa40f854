//! Admin authentication middleware.
//!
//! Admin routes require an `X-API-Key` header whose SHA-256 digest matches
//! the configured `security.admin_api_key_hash`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::crypto::verify_api_key;

use crate::app::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Marker stored in request extensions once the admin key is verified.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

/// Checks the admin key carried by `headers`.
pub fn authorize_admin(headers: &HeaderMap, expected_hash: &str) -> Result<AdminAuth, &'static str> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or("Invalid or missing API key")?;

    if expected_hash.trim().is_empty() || !verify_api_key(api_key, expected_hash) {
        return Err("Invalid or missing API key");
    }

    Ok(AdminAuth)
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authorize_admin(req.headers(), &state.config.security.admin_api_key_hash) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(message) => {
            tracing::warn!(path = %req.uri().path(), "Admin authentication failed");
            unauthorized_response(message)
        }
    }
}

/// Helper to create unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use shared::crypto::sha256_hex;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_authorize_admin_accepts_matching_key() {
        let hash = sha256_hex("admin-secret");
        assert!(authorize_admin(&headers_with_key("admin-secret"), &hash).is_ok());
    }

    #[test]
    fn test_authorize_admin_rejects_wrong_key() {
        let hash = sha256_hex("admin-secret");
        assert!(authorize_admin(&headers_with_key("guess"), &hash).is_err());
    }

    #[test]
    fn test_authorize_admin_rejects_missing_header() {
        let hash = sha256_hex("admin-secret");
        assert!(authorize_admin(&HeaderMap::new(), &hash).is_err());
        assert!(authorize_admin(&headers_with_key("  "), &hash).is_err());
    }

    #[test]
    fn test_authorize_admin_rejects_when_unconfigured() {
        assert!(authorize_admin(&headers_with_key("anything"), "").is_err());
    }

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("Invalid or missing API key");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
