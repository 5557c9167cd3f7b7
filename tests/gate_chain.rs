//! Gate composition tests driven through the router without a socket.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use gatekeeper::http::{build_routes, Gates, Route};
use gatekeeper::users::handlers::UserResponse;
use gatekeeper::{ClientLimiterRegistry, Identity, TokenCodec};
use serde_json::json;
use tower::ServiceExt;

use common::{body_text, request_from, test_server};

const PEER: &str = "10.0.0.1:40000";

async fn register_and_login(router: &axum::Router, email: &str) -> UserResponse {
    let body = json!({ "name": "Test", "email": email, "password": "correct-horse" });
    let response = router
        .clone()
        .oneshot(request_from(PEER, "POST", "/auth/register", None, Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(request_from(PEER, "POST", "/auth/login", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_public_route_is_admitted_without_token() {
    let server = test_server(5, 1.0);
    let response = server
        .router()
        .oneshot(request_from(PEER, "GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_protected_route_without_header() {
    let server = test_server(5, 1.0);
    let response = server
        .router()
        .oneshot(request_from(PEER, "GET", "/api/me", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "missing token");
}

#[tokio::test]
async fn test_wrong_scheme_counts_as_missing() {
    let server = test_server(10, 1.0);
    for value in ["Token abc.def.ghi", "bearer abc.def.ghi", "Bearer"] {
        let response = server
            .router()
            .oneshot(request_from(PEER, "GET", "/api/me", Some(value), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(body_text(response).await, "missing token", "{value}");
    }
}

#[tokio::test]
async fn test_unverifiable_tokens_are_invalid() {
    let server = test_server(20, 1.0);
    let foreign = TokenCodec::new("some-other-service-secret-value")
        .create_token("1", Duration::hours(1))
        .unwrap();
    let expired = server.codec().create_token("1", Duration::seconds(-5)).unwrap();
    let unsigned = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(r#"{"sub":"1","iat":0,"exp":99999999999}"#),
    );

    for token in ["garbage", "abc.def.ghi", foreign.as_str(), expired.as_str(), unsigned.as_str()] {
        let header = format!("Bearer {token}");
        let response = server
            .router()
            .oneshot(request_from(PEER, "GET", "/api/me", Some(&header), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{token}");
        assert_eq!(body_text(response).await, "invalid token", "{token}");
    }
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let server = test_server(10, 1.0);
    let router = server.router();
    let login = register_and_login(&router, "ada@example.com").await;
    let header = format!("Bearer {}", login.token.unwrap());

    let response = router
        .oneshot(request_from(PEER, "GET", "/api/me", Some(&header), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let profile: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(profile["id"], login.id);
    assert_eq!(profile["email"], "ada@example.com");
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn test_non_numeric_subject_is_bad_request() {
    let server = test_server(5, 1.0);
    let token = server.codec().create_token("alice", Duration::hours(1)).unwrap();
    let header = format!("Bearer {token}");

    let response = server
        .router()
        .oneshot(request_from(PEER, "GET", "/api/me", Some(&header), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid user id");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = test_server(5, 1.0);
    let token = server.codec().create_token("404", Duration::hours(1)).unwrap();
    let header = format!("Bearer {token}");

    let response = server
        .router()
        .oneshot(request_from(PEER, "GET", "/api/me", Some(&header), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admission_runs_before_auth() {
    let hits = Arc::new(AtomicUsize::new(0));
    let codec = Arc::new(TokenCodec::new(common::SECRET));
    let limiter = Arc::new(ClientLimiterRegistry::new(5, 0.0001));
    let gates = Gates { limiter: limiter.clone(), codec: codec.clone() };

    let counter = hits.clone();
    let router = build_routes(
        vec![Route::protected(
            "/secret",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "secret"
                }
            }),
        )],
        &gates,
    );

    for _ in 0..5 {
        assert!(limiter.admit("10.0.0.1"));
    }

    let token = codec.create_token("1", Duration::hours(1)).unwrap();
    let valid = format!("Bearer {token}");
    for authorization in [Some(valid.as_str()), Some("Bearer garbage"), None] {
        let response = router
            .clone()
            .oneshot(request_from(PEER, "GET", "/secret", authorization, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_text(response).await, "rate limit exceeded");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_public_route_budget_is_capacity() {
    let server = test_server(5, 0.0001);
    let mut statuses = Vec::new();

    for _ in 0..10 {
        let response = server
            .router()
            .oneshot(request_from(PEER, "GET", "/health", None, None))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[..5], [StatusCode::OK; 5]);
    assert_eq!(statuses[5..], [StatusCode::TOO_MANY_REQUESTS; 5]);
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let server = test_server(2, 0.0001);
    let router = server.router();

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(request_from("10.0.0.1:1000", "GET", "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = router
        .clone()
        .oneshot(request_from("10.0.0.1:2000", "GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "port is not part of the key");

    let response = router
        .oneshot(request_from("10.0.0.2:1000", "GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.limiter().len(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_never_exceed_capacity() {
    let server = test_server(5, 0.0001);
    let router = server.router();

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .oneshot(request_from(PEER, "GET", "/health", None, None))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}

#[tokio::test]
async fn test_identity_on_unprotected_route_is_unauthenticated() {
    let gates = Gates {
        limiter: Arc::new(ClientLimiterRegistry::new(5, 1.0)),
        codec: Arc::new(TokenCodec::new(common::SECRET)),
    };
    let router = build_routes(
        vec![Route::public(
            "/whoami",
            get(|Identity(user): Identity| async move { user.subject }),
        )],
        &gates,
    );

    let response = router
        .oneshot(request_from(PEER, "GET", "/whoami", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_errors() {
    let server = test_server(20, 1.0);
    let router = server.router();
    register_and_login(&router, "grace@example.com").await;

    let duplicate = json!({ "email": "Grace@Example.com", "password": "another" });
    let response = router
        .clone()
        .oneshot(request_from(PEER, "POST", "/auth/register", None, Some(duplicate)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let wrong = json!({ "email": "grace@example.com", "password": "wrong" });
    let response = router
        .clone()
        .oneshot(request_from(PEER, "POST", "/auth/login", None, Some(wrong)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "invalid credentials");

    let mut request = request_from(PEER, "POST", "/auth/login", None, None);
    *request.body_mut() = axum::body::Body::from("{not json");
    request
        .headers_mut()
        .insert("content-type", "application/json".parse().unwrap());
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid json");
}

#[tokio::test]
async fn test_unknown_paths_are_rate_limited() {
    let server = test_server(2, 0.0001);
    let router = server.router();

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(request_from(PEER, "GET", "/no/such/path", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = router
        .oneshot(request_from(PEER, "GET", "/no/such/path", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
