//! User repository for Gator.
//!
//! This module provides CRUD operations for users in the database.

use chrono::Utc;
use uuid::Uuid;

use super::user::{NewUser, User};
use super::{is_unique_violation, now_timestamp, parse_datetime, DbPool};
use crate::{GatorError, Result};

/// Row type for users.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Fails with a validation error if the name is taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO users (id, created_at, updated_at, name) VALUES ($1, $2, $3, $4)",
        )
        .bind(&id)
        .bind(&now)
        .bind(&now)
        .bind(&new_user.name)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("user {:?} already exists", new_user.name))
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| GatorError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(User::from))
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(User::from))
    }

    /// List all users ordered by name.
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Delete every user. Feeds, follows and posts go with them.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
