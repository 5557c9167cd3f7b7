//! Account handlers: register, login, profile, listing.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::users::store::{User, UserError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = payload.map_err(|_| ApiError::MalformedRequest("invalid json".into()))?;
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::MalformedRequest("email and password are required".into()));
    }

    let hasher = state.hasher.clone();
    let password = req.password;
    let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state
        .users
        .create(&req.name, &req.email, digest)
        .map_err(|e| match e {
            UserError::DuplicateEmail => ApiError::Conflict(e.to_string()),
        })?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        token: None,
    }))
}

/// `POST /auth/login`: verify credentials and issue a session token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = payload.map_err(|_| ApiError::MalformedRequest("invalid json".into()))?;

    let Some(user) = state.users.find_by_email(&req.email) else {
        tracing::debug!("Login for unknown email");
        return Err(ApiError::Unauthenticated("invalid credentials"));
    };

    let hasher = state.hasher.clone();
    let digest = user.password_hash.clone();
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?;
    if !verified {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::Unauthenticated("invalid credentials"));
    }

    let token = state
        .codec
        .create_token(&user.id.to_string(), state.token_ttl)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    metrics::record_token_issued();

    tracing::info!(user_id = user.id, "Token issued");
    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        token: Some(token),
    }))
}

/// `GET /api/me`
pub async fn me(State(state): State<AppState>, Identity(caller): Identity) -> ApiResult<Json<User>> {
    let id = caller
        .user_id()
        .ok_or_else(|| ApiError::MalformedRequest("invalid user id".into()))?;

    state
        .users
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

/// `GET /api/users`
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.users.list())
}
