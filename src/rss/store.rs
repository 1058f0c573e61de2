//! Storage seams used by the ingestion engine.
//!
//! [`FeedRepository`](super::FeedRepository) and
//! [`PostRepository`](super::PostRepository) implement these over sqlx;
//! tests substitute in-memory doubles.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Feed, NewPost, Post};
use crate::Result;

/// Feed selection and bookkeeping for the scheduler.
pub trait FeedStore {
    /// The feed that has waited longest: never fetched first, then oldest
    /// `last_fetched_at`, ties broken by `created_at` and then `id`.
    fn next_feed_to_fetch(&self) -> impl Future<Output = Result<Option<Feed>>> + Send;

    /// Record that `feed_id` was picked at `at`.
    fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>)
        -> impl Future<Output = Result<()>> + Send;
}

/// Post persistence for the ingestor.
pub trait PostStore {
    /// Insert a post. A URL that is already stored fails with
    /// [`GatorError::Conflict`](crate::GatorError::Conflict) when the driver
    /// reports the violation kind.
    fn insert_post(&self, post: &NewPost) -> impl Future<Output = Result<Post>> + Send;
}
