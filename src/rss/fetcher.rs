//! RSS feed fetcher.
//!
//! Downloads a feed over HTTP and decodes it into a [`RawFeedDocument`].
//! Dates are kept as raw strings; normalization happens at ingest time.

use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::error::{GatorError, Result};
use crate::rss::types::{RawFeedDocument, RawItem};

/// Something that can produce a feed document for a URL.
pub trait FeedSource {
    /// Fetch and decode the feed at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<RawFeedDocument>> + Send;
}

/// HTTP feed fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct RssFetcher {
    client: Client,
    max_size: u64,
}

impl RssFetcher {
    /// Create a fetcher from the aggregator settings.
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to fetch feed: {}", e)))?;

        debug!("GET {} -> {}", url, response.status());

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(GatorError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_size
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to read response: {}", e)))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_size {
                return Err(GatorError::Fetch(format!(
                    "feed too large: more than {} bytes",
                    self.max_size
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

impl FeedSource for RssFetcher {
    async fn fetch(&self, url: &str) -> Result<RawFeedDocument> {
        let body = self.download(url).await?;
        parse_document(&body)
    }
}

/// Decode an RSS 2.0 document.
///
/// Channel and item titles and descriptions are HTML-unescaped once more
/// after XML decoding, since many feeds double-encode entities.
pub fn parse_document(bytes: &[u8]) -> Result<RawFeedDocument> {
    let channel = rss::Channel::read_from(Cursor::new(bytes))
        .map_err(|e| GatorError::Parse(format!("failed to parse feed: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| RawItem {
            title: unescape(item.title().unwrap_or_default()),
            link: item.link().unwrap_or_default().to_string(),
            description: unescape(item.description().unwrap_or_default()),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect();

    Ok(RawFeedDocument {
        title: unescape(channel.title()),
        link: channel.link().to_string(),
        description: unescape(channel.description()),
        items,
    })
}

fn unescape(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
