//! Feed aggregation scheduler.
//!
//! Each tick picks the single feed that has waited longest, marks it as
//! fetched, downloads it and stores its new posts. Failures are logged and
//! end the cycle; nothing short of cancellation stops the loop.

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::fetcher::FeedSource;
use super::ingest::{IngestReport, PostIngestor};
use super::store::{FeedStore, PostStore};
use crate::{GatorError, Result};

/// Result of one scheduler cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// No feeds registered.
    Idle,
    /// Selecting or marking the feed failed.
    StoreFailed(GatorError),
    /// The feed was marked but could not be fetched or decoded.
    FetchFailed {
        /// Feed that failed.
        feed_id: Uuid,
        /// Fetch or parse error.
        error: GatorError,
    },
    /// The feed was fetched and its items ingested.
    Ingested {
        /// Feed that was fetched.
        feed_id: Uuid,
        /// Per-item tally.
        report: IngestReport,
    },
    /// Cancelled while the fetch was in flight.
    Cancelled,
}

/// Periodic feed aggregator.
pub struct Scheduler<S, P, F> {
    feeds: S,
    ingestor: PostIngestor<P>,
    source: F,
    interval: Duration,
}

impl<S, P, F> Scheduler<S, P, F>
where
    S: FeedStore,
    P: PostStore,
    F: FeedSource,
{
    /// Create a scheduler running one cycle per `interval`.
    pub fn new(feeds: S, posts: P, source: F, interval: Duration) -> Self {
        Self {
            feeds,
            ingestor: PostIngestor::new(posts),
            source,
            interval,
        }
    }

    /// Time between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until `cancel` fires.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next one instead of triggering a burst.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Collecting feeds every {:?}", self.interval);

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            if let CycleOutcome::Cancelled = self.run_cycle(&cancel).await {
                break;
            }
        }

        info!("Aggregator stopped");
    }

    /// Fetch and ingest the next feed.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleOutcome {
        let feed = match self.feeds.next_feed_to_fetch().await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                debug!("No feeds to fetch");
                return CycleOutcome::Idle;
            }
            Err(e) => {
                error!("Failed to select next feed: {}", e);
                return CycleOutcome::StoreFailed(e);
            }
        };

        if let Err(e) = self.feeds.mark_fetched(feed.id, Utc::now()).await {
            error!("Failed to mark feed {} as fetched: {}", feed.id, e);
            return CycleOutcome::StoreFailed(e);
        }

        info!("Fetching feed {} ({})", feed.name, feed.url);

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Fetch of {} cancelled", feed.url);
                return CycleOutcome::Cancelled;
            }
            result = self.source.fetch(&feed.url) => result,
        };

        let doc = match fetched {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Failed to fetch feed {}: {}", feed.url, e);
                return CycleOutcome::FetchFailed {
                    feed_id: feed.id,
                    error: e,
                };
            }
        };

        let report = self.ingestor.ingest(feed.id, &doc).await;
        if report.created > 0 {
            info!(
                "Feed {} updated: {} new post(s), {} duplicate(s), {} skipped",
                feed.name,
                report.created,
                report.duplicates,
                report.invalid_dates + report.failed
            );
        } else {
            debug!("Feed {} updated: no new posts", feed.name);
        }

        CycleOutcome::Ingested {
            feed_id: feed.id,
            report,
        }
    }
}

/// Parse an interval such as `30s`, `1m`, `1h30m` or `1.5h`.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The result must
/// be positive.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let invalid = || GatorError::Usage(format!("invalid interval: {:?}", s));

    let input = s.trim();
    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    if rest != "0" {
        while !rest.is_empty() {
            let number_end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let (number, tail) = rest.split_at(number_end);
            let value: f64 = number.parse().map_err(|_| invalid())?;

            let unit_end = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_end);
            total_nanos += value * unit_nanos(unit).ok_or_else(invalid)?;

            rest = tail;
        }
    }

    if negative || total_nanos < 1.0 {
        return Err(GatorError::Usage(format!(
            "interval must be positive: {:?}",
            s
        )));
    }
    if total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

fn unit_nanos(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" | "μs" => Some(1e3),
        "ms" => Some(1e6),
        "s" => Some(1e9),
        "m" => Some(60e9),
        "h" => Some(3600e9),
        _ => None,
    }
}
