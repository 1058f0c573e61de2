//! User repository for gator.

use chrono::Utc;
use uuid::Uuid;

use super::user::{User, UserRow};
use super::DbPool;
use crate::datetime::to_db_timestamp;
use crate::{GatorError, Result};

/// Repository for user operations.
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
    /// Fails with [`GatorError::Conflict`] when the name is taken.
    pub async fn create(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatorError::Usage("user name must not be empty".to_string()));
        }

        let id = Uuid::new_v4();
        let now = to_db_timestamp(&Utc::now());
        sqlx::query(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound("user".to_string()))
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// List all users (ordered by name).
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete every user, cascading to their feeds, follows and posts.
    pub async fn reset(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}
