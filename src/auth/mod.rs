//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! login handler
//!     → token.rs (create_token: sign claims with the process secret)
//!
//! Protected request:
//!     → middleware.rs (Authorization: Bearer <token>)
//!     → token.rs (parse_token: algorithm, signature, expiry)
//!     → identity.rs (AuthenticatedUser attached to the request)
//!     → handler reads it through the Identity extractor
//! ```
//!
//! # Design Decisions
//! - One symmetric algorithm (HS256); anything else is rejected before
//!   signature checks
//! - Callers see only "missing token" or "invalid token"
//! - The codec is an owned value passed by `Arc`, not a global

pub mod identity;
pub mod middleware;
pub mod token;

pub use identity::{AuthenticatedUser, Identity};
pub use middleware::auth_middleware;
pub use token::{Claims, TokenCodec, TokenError};
