//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address recorded)
//!     → server.rs (request ID, tracing span, metrics, timeout)
//!     → routes.rs (admission gate → [auth gate] → handler)
//!     → Send to client
//! ```

pub mod routes;
pub mod server;

pub use routes::{build_routes, Gates, Route};
pub use server::{AppState, HttpServer};
