//! In-memory user records.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("email already registered")]
    DuplicateEmail,
}

/// Thread-safe user table with a unique email index.
pub struct UserStore {
    users: DashMap<u64, User>,
    /// Normalized email -> user id.
    emails: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a new user. Emails are unique case-insensitively.
    pub fn create(&self, name: &str, email: &str, password_hash: String) -> Result<User, UserError> {
        let email = normalize_email(email);

        // The email shard stays locked until the user row exists.
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => Err(UserError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let user = User {
                    id,
                    name: name.trim().to_string(),
                    email,
                    password_hash,
                    created_at: Utc::now(),
                };
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.users.get(&id).map(|r| r.value().clone())
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let id = *self.emails.get(&normalize_email(email))?;
        self.get(id)
    }

    /// All users ordered by id.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
