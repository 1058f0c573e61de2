//! gator - a command-line RSS aggregator
//!
//! Users register feeds; `gator aggregate` polls them one at a time on a
//! fixed interval and stores their posts, which `gator browse` lists.

pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;

pub use config::Config;
pub use db::{Database, User, UserRepository};
pub use error::{GatorError, Result};
pub use rss::{
    normalize_pub_date, CycleOutcome, Feed, FeedRepository, IngestReport, Post, PostIngestor,
    PostRepository, RssFetcher, Scheduler,
};
