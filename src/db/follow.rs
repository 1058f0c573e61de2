//! Feed follow records.
//!
//! A follow links a user to a feed they want to read. Feeds exist
//! independently of follows; removing a follow never touches the feed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{parse_id, parse_timestamp, DbPool};
use crate::datetime::to_db_timestamp;
use crate::{GatorError, Result};

/// A follow relationship between a user and a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: Uuid,
    /// Following user.
    pub user_id: Uuid,
    /// Followed feed.
    pub feed_id: Uuid,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A follow together with the user and feed names, for display.
#[derive(Debug, Clone)]
pub struct FeedFollowWithNames {
    /// The follow.
    pub follow: FeedFollow,
    /// Name of the following user.
    pub user_name: String,
    /// Name of the followed feed.
    pub feed_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowWithNamesRow {
    id: String,
    user_id: String,
    feed_id: String,
    created_at: String,
    updated_at: String,
    user_name: String,
    feed_name: String,
}

impl TryFrom<FeedFollowWithNamesRow> for FeedFollowWithNames {
    type Error = GatorError;

    fn try_from(row: FeedFollowWithNamesRow) -> Result<Self> {
        Ok(FeedFollowWithNames {
            follow: FeedFollow {
                id: parse_id(&row.id)?,
                user_id: parse_id(&row.user_id)?,
                feed_id: parse_id(&row.feed_id)?,
                created_at: parse_timestamp(&row.created_at)?,
                updated_at: parse_timestamp(&row.updated_at)?,
            },
            user_name: row.user_name,
            feed_name: row.feed_name,
        })
    }
}

const SELECT_WITH_NAMES: &str = r#"
    SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
           u.name AS user_name, f.name AS feed_name
    FROM feed_follows ff
    JOIN users u ON u.id = ff.user_id
    JOIN feeds f ON f.id = ff.feed_id
"#;

/// Repository for feed follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Follow a feed.
    ///
    /// Fails with [`GatorError::Conflict`] when the user already follows it.
    pub async fn create(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollowWithNames> {
        let id = Uuid::new_v4();
        let now = to_db_timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        let query = format!("{SELECT_WITH_NAMES} WHERE ff.id = $1");
        let row = sqlx::query_as::<_, FeedFollowWithNamesRow>(&query)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))?;

        row.try_into()
    }

    /// List the follows of a user (ordered by feed name).
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollowWithNames>> {
        let query = format!("{SELECT_WITH_NAMES} WHERE ff.user_id = $1 ORDER BY f.name ASC");
        let rows = sqlx::query_as::<_, FeedFollowWithNamesRow>(&query)
            .bind(user_id.to_string())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(FeedFollowWithNames::try_from).collect()
    }

    /// Remove the follow of `user_id` on the feed with the given URL.
    ///
    /// Returns whether a follow was removed.
    pub async fn delete_by_user_and_url(&self, user_id: Uuid, url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = $1
              AND feed_id IN (SELECT id FROM feeds WHERE url = $2)
            "#,
        )
        .bind(user_id.to_string())
        .bind(url)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
