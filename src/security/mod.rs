//! Request admission.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP token bucket, 429 when empty)
//!     → auth gate (protected routes only)
//!     → handler
//!
//! Background (only when idle retention is configured):
//!     sweep.rs → evict buckets idle past the retention window
//! ```
//!
//! # Design Decisions
//! - Admission runs first on every route, before any credential work
//! - One global policy (capacity, refill rate) for all clients
//! - Fail closed: an empty bucket short-circuits the whole chain

pub mod rate_limit;
pub mod sweep;

pub use rate_limit::{admission_middleware, ClientLimiterRegistry};
