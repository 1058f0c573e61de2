//! Post ingestion.
//!
//! Turns the items of a fetched document into stored posts. Every item is
//! handled on its own: a bad date or a failed insert skips that item and the
//! rest of the document is still processed.

use tracing::{debug, error, warn};
use uuid::Uuid;

use super::date::normalize_pub_date;
use super::dedup::{classify_insert_error, InsertErrorKind};
use super::store::PostStore;
use super::types::{NewPost, RawFeedDocument};

/// Tally of one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Posts inserted.
    pub created: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items skipped because the publish date could not be parsed.
    pub invalid_dates: usize,
    /// Items whose insert failed for another reason.
    pub failed: usize,
}

impl IngestReport {
    /// Number of insert attempts made.
    pub fn attempted(&self) -> usize {
        self.created + self.duplicates + self.failed
    }
}

/// Maps feed items to posts.
pub struct PostIngestor<P> {
    posts: P,
}

impl<P: PostStore> PostIngestor<P> {
    /// Create an ingestor writing to `posts`.
    pub fn new(posts: P) -> Self {
        Self { posts }
    }

    /// Ingest every item of `doc` for `feed_id`, in document order.
    pub async fn ingest(&self, feed_id: Uuid, doc: &RawFeedDocument) -> IngestReport {
        let mut report = IngestReport::default();

        for item in &doc.items {
            let published_at = match normalize_pub_date(&item.pub_date) {
                Ok(dt) => dt,
                Err(e) => {
                    warn!("Skipping item {:?}: {}", item.link, e);
                    report.invalid_dates += 1;
                    continue;
                }
            };

            let post = NewPost::new(feed_id, item.title.as_str(), item.link.as_str(), published_at)
                .with_description(item.description.as_str());

            match self.posts.insert_post(&post).await {
                Ok(_) => report.created += 1,
                Err(e) => match classify_insert_error(&e) {
                    InsertErrorKind::Duplicate => {
                        debug!("Post already stored: {}", item.link);
                        report.duplicates += 1;
                    }
                    InsertErrorKind::Other => {
                        error!("Failed to create post {:?}: {}", item.link, e);
                        report.failed += 1;
                    }
                },
            }
        }

        report
    }
}
