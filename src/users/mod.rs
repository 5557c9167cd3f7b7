//! User accounts: the handlers the gates protect.
//!
//! Storage is an in-memory map; nothing here is durable.

pub mod handlers;
pub mod password;
pub mod store;

pub use password::{Argon2Hasher, PasswordHasher};
pub use store::{User, UserStore};
