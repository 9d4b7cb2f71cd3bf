//! Google News RSS feed adapter.
//!
//! Fetches one or more Google News search feeds and merges them into a
//! single article batch, deduplicated by link. Default queries target Indian
//! stock-market coverage (NSE/BSE plus smallcap/midcap breakout searches).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{dedup_by_link, Article, ArticleFeed, FeedError};

/// Default feed queries, mirroring the broad + breakout-focused searches
const DEFAULT_FEED_URLS: &[&str] = &[
    "https://news.google.com/rss/search?q=Indian+Stock+Market+NSE+BSE&hl=en-IN&gl=IN&ceid=IN:en",
    "https://news.google.com/rss/search?q=NSE+BSE+Smallcap+Midcap+Breakout&hl=en-IN&gl=IN&ceid=IN:en",
];

/// Per-feed fetch timeout in seconds
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Google News RSS client
pub struct GoogleNewsFeed {
    client: reqwest::Client,
    feed_urls: Vec<String>,
}

impl GoogleNewsFeed {
    /// Create with the default Indian-market queries
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_FEED_URLS.iter().map(|s| s.to_string()).collect())
    }

    /// Create with custom feed URLs
    pub fn with_urls(feed_urls: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { client, feed_urls }
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<Article>, FeedError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let content = response.bytes().await?;
        let channel = rss::Channel::read_from(&content[..])
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        let now = Utc::now();
        let articles = channel
            .items()
            .iter()
            .filter_map(|item| {
                let title = item.title()?.to_string();
                let link = item.link()?.to_string();
                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or(now);
                let source = item
                    .source()
                    .and_then(|s| s.title().map(|t| t.to_string()))
                    .unwrap_or_else(|| "Google News".to_string());

                Some(Article {
                    title,
                    link,
                    published,
                    source,
                    snippet: item.description().unwrap_or("").to_string(),
                })
            })
            .collect();

        Ok(articles)
    }
}

impl Default for GoogleNewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleFeed for GoogleNewsFeed {
    fn name(&self) -> &str {
        "google-news"
    }

    async fn fetch(&self) -> Result<Vec<Article>, FeedError> {
        let mut batches = Vec::with_capacity(self.feed_urls.len());

        for url in &self.feed_urls {
            match self.fetch_one(url).await {
                Ok(batch) => {
                    debug!(url, count = batch.len(), "Fetched RSS feed");
                    batches.push(batch);
                }
                Err(e) => {
                    // A single dead feed must not sink the others.
                    warn!(url, error = %e, "RSS feed fetch failed");
                }
            }
        }

        if batches.is_empty() {
            return Err(FeedError::Network("all RSS feeds failed".to_string()));
        }

        Ok(dedup_by_link(batches))
    }
}
