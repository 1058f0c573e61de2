//! Feed ingestion for gator.
//!
//! This module provides:
//! - Publish date normalization
//! - Feed fetching and RSS decoding
//! - Duplicate-tolerant post ingestion
//! - The polling scheduler behind `gator aggregate`

mod date;
mod dedup;
mod fetcher;
mod ingest;
mod repository;
mod scheduler;
mod store;
mod types;

pub use date::{match_layout, normalize_pub_date, DateLayout, LAYOUTS};
pub use dedup::{classify_insert_error, InsertErrorKind};
pub use fetcher::{parse_document, FeedSource, RssFetcher};
pub use ingest::{IngestReport, PostIngestor};
pub use repository::{FeedRepository, PostRepository};
pub use scheduler::{parse_interval, CycleOutcome, Scheduler};
pub use store::{FeedStore, PostStore};
pub use types::{
    Feed, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed, RawFeedDocument, RawItem,
    MAX_FEED_SIZE,
};
