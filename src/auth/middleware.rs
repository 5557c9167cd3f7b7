//! Bearer-token gate for protected routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::identity::AuthenticatedUser;
use crate::auth::token::TokenCodec;
use crate::error::ApiError;
use crate::observability::metrics;

/// Required prefix of the `Authorization` header. Case-sensitive, one space.
pub const BEARER_PREFIX: &str = "Bearer ";

pub const MISSING_TOKEN: &str = "missing token";
pub const INVALID_TOKEN: &str = "invalid token";

/// Verify the bearer token and attach the caller's identity.
///
/// Every token failure collapses to the same `invalid token` response.
pub async fn auth_middleware(
    State(codec): State<Arc<TokenCodec>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // 1. Header check
    let Some(token) = bearer_token(request.headers()) else {
        metrics::record_auth_rejected("missing");
        return ApiError::Unauthenticated(MISSING_TOKEN).into_response();
    };

    // 2. Token parse
    let claims = match codec.parse_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), reason = %e, "Bearer token rejected");
            metrics::record_auth_rejected("invalid");
            return ApiError::Unauthenticated(INVALID_TOKEN).into_response();
        }
    };

    // 3. Attach
    request
        .extensions_mut()
        .insert(AuthenticatedUser { subject: claims.sub });
    next.run(request).await
}

/// Token part of `Authorization: Bearer <token>`, if the header has that shape.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
}
