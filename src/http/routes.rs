//! Route table and gate composition.
//!
//! # Design Decisions
//! - Each route declares `protected` once, at registration
//! - Admission wraps every route; auth wraps protected routes only, inside it
//! - Resulting order is fixed:
//!   `admission ⊃ auth ⊃ handler` or `admission ⊃ handler`
//! - Unknown paths hit an explicit fallback that also sits behind admission

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};

use crate::auth::{auth_middleware, TokenCodec};
use crate::error::ApiError;
use crate::http::server::AppState;
use crate::security::{admission_middleware, ClientLimiterRegistry};
use crate::users::handlers;

/// A path, its handlers, and whether it sits behind the auth gate.
pub struct Route<S> {
    path: &'static str,
    handler: MethodRouter<S>,
    protected: bool,
}

impl<S> Route<S> {
    pub fn public(path: &'static str, handler: MethodRouter<S>) -> Self {
        Self {
            path,
            handler,
            protected: false,
        }
    }

    pub fn protected(path: &'static str, handler: MethodRouter<S>) -> Self {
        Self {
            path,
            handler,
            protected: true,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }
}

/// Shared gate state, built once at startup.
#[derive(Clone)]
pub struct Gates {
    pub limiter: Arc<ClientLimiterRegistry>,
    pub codec: Arc<TokenCodec>,
}

/// Wrap each route in its gates and collect them into one router.
pub fn build_routes<S>(routes: Vec<Route<S>>, gates: &Gates) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = Router::new();

    for route in routes {
        let handler = if route.protected {
            route
                .handler
                .route_layer(middleware::from_fn_with_state(gates.codec.clone(), auth_middleware))
        } else {
            route.handler
        };
        router = router.route(route.path, handler);
    }

    // The fallback must exist before the layer is applied to be covered by it.
    router
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            gates.limiter.clone(),
            admission_middleware,
        ))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("not found".into())
}

/// The service's route table.
pub fn service_routes() -> Vec<Route<AppState>> {
    vec![
        Route::public("/health", get(health)),
        Route::public("/auth/register", post(handlers::register)),
        Route::public("/auth/login", post(handlers::login)),
        Route::protected("/api/me", get(handlers::me)),
        Route::protected("/api/users", get(handlers::list_users)),
    ]
}

async fn health() -> &'static str {
    "ok"
}
