//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the codec, limiter and user store once, at startup
//! - Create the Axum router from the route table and wire the gates
//! - Wire up cross-cutting layers (request ID, tracing, timeout, metrics)
//! - Serve with peer addresses attached and stop on the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenCodec;
use crate::config::ServiceConfig;
use crate::http::routes::{build_routes, service_routes, Gates};
use crate::observability::metrics;
use crate::security::{sweep, ClientLimiterRegistry};
use crate::users::{Argon2Hasher, PasswordHasher, UserStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub codec: Arc<TokenCodec>,
    pub token_ttl: chrono::Duration,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    gates: Gates,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_hasher(config, Arc::new(Argon2Hasher::default()))
    }

    /// Same as [`new`](Self::new) with a caller-supplied password hasher.
    pub fn with_hasher(config: ServiceConfig, hasher: Arc<dyn PasswordHasher>) -> Self {
        let codec = Arc::new(TokenCodec::new(config.auth.jwt_secret.as_bytes()));
        let limiter = Arc::new(ClientLimiterRegistry::from_config(&config.rate_limit));
        let gates = Gates { limiter, codec: codec.clone() };

        let state = AppState {
            users: Arc::new(UserStore::new()),
            hasher,
            codec,
            token_ttl: config.auth.token_ttl(),
        };

        let router = Self::build_router(&config, state, &gates);
        Self {
            router,
            config,
            gates,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &ServiceConfig, state: AppState, gates: &Gates) -> Router {
        build_routes(service_routes(), gates)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            capacity = self.gates.limiter.capacity(),
            refill_per_second = self.gates.limiter.refill_per_second(),
            "HTTP server starting"
        );

        if let Some(retention) = self.config.rate_limit.idle_retention_secs {
            sweep::spawn_idle_sweep(
                self.gates.limiter.clone(),
                Duration::from_secs(retention),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                shutdown.resubscribe(),
            );
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<ClientLimiterRegistry> {
        &self.gates.limiter
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.gates.codec
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
