//! Authentication and request-admission gateway.
//!
//! Issues and verifies HS256 session tokens, admits requests through a
//! per-client token bucket, and composes both as middleware in front of
//! routes declared public or protected.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod users;

pub use auth::{Identity, TokenCodec};
pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::ClientLimiterRegistry;
