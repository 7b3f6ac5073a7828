//! User model for Gator.

use chrono::{DateTime, Utc};

/// User entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID (UUID).
    pub id: String,
    /// User name (unique).
    pub name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User name.
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
