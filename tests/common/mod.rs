//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response};
use gatekeeper::config::ServiceConfig;
use gatekeeper::users::{Argon2Hasher, PasswordHasher};
use gatekeeper::{HttpServer, Shutdown};
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Config with a test secret, metrics off, and the given bucket policy.
pub fn test_config(capacity: u32, refill_per_second: f64) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.rate_limit.capacity = capacity;
    config.rate_limit.refill_per_second = refill_per_second;
    config.observability.metrics_enabled = false;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// Argon2 with minimal cost so registration is fast in tests.
pub fn fast_hasher() -> Arc<dyn PasswordHasher> {
    Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap())
}

pub fn test_server(capacity: u32, refill_per_second: f64) -> HttpServer {
    HttpServer::with_hasher(test_config(capacity, refill_per_second), fast_hasher())
}

/// Build a request as if it arrived from `peer`.
#[allow(dead_code)]
pub fn request_from(
    peer: &str,
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    json: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let body = match json {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let mut request = builder.body(body).unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Run `server` on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_live(server: HttpServer) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown, handle)
}
