//! Per-request authenticated identity.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Verified caller identity, attached to request extensions by the auth gate.
///
/// Lives only as long as the request it was attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// `sub` claim of the verified token.
    pub subject: String,
}

impl AuthenticatedUser {
    /// Numeric user id, if the subject is one.
    pub fn user_id(&self) -> Option<u64> {
        self.subject.parse().ok()
    }
}

/// Extractor for handlers behind the auth gate.
///
/// ```rust,ignore
/// async fn me(Identity(user): Identity) -> String {
///     user.subject
/// }
/// ```
///
/// Rejects with 401 when the route was not wrapped by the gate.
pub struct Identity(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Identity)
            .ok_or(ApiError::Unauthenticated("missing token"))
    }
}
