//! Reddit hot-post feed adapter.
//!
//! Pulls the `hot.json` listing of one or more subreddits and maps each post
//! into the shared [`Article`] shape. Defaults to the two Indian-market
//! communities the sentiment scorer was tuned against.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Article, ArticleFeed, FeedError};

/// Default subreddits
const DEFAULT_SUBREDDITS: &[&str] = &["IndianStreetBets", "IndiaInvestments"];

/// Posts fetched per subreddit
const DEFAULT_LIMIT: u32 = 15;

/// Per-request timeout in seconds
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Reddit requires a distinguishable user agent for JSON endpoints
const USER_AGENT: &str = "nifty-signals/0.1 market-news-reader";

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<PostWrapper>,
}

#[derive(Debug, Deserialize)]
struct PostWrapper {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    created_utc: f64,
    subreddit: String,
}

// ============================================================================
// Adapter
// ============================================================================

/// Reddit hot-post client
pub struct RedditFeed {
    client: reqwest::Client,
    subreddits: Vec<String>,
    limit: u32,
}

impl RedditFeed {
    /// Create with the default subreddits
    pub fn new() -> Self {
        Self::with_subreddits(DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect())
    }

    /// Create with custom subreddits
    pub fn with_subreddits(subreddits: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            subreddits,
            limit: DEFAULT_LIMIT,
        }
    }

    async fn fetch_hot(&self, subreddit: &str) -> Result<Vec<Article>, FeedError> {
        let url = format!(
            "https://www.reddit.com/r/{}/hot.json?limit={}",
            subreddit, self.limit
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|wrapper| map_post(wrapper.data))
            .collect())
    }
}

fn map_post(post: Post) -> Article {
    let published = Utc
        .timestamp_opt(post.created_utc as i64, 0)
        .single()
        .unwrap_or_else(Utc::now);

    Article {
        title: post.title,
        link: format!("https://reddit.com{}", post.permalink),
        published,
        source: format!("Reddit: r/{}", post.subreddit),
        snippet: post.selftext,
    }
}

impl Default for RedditFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleFeed for RedditFeed {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self) -> Result<Vec<Article>, FeedError> {
        let mut articles = Vec::new();
        let mut failures = 0;

        for subreddit in &self.subreddits {
            match self.fetch_hot(subreddit).await {
                Ok(mut batch) => {
                    debug!(subreddit, count = batch.len(), "Fetched subreddit");
                    articles.append(&mut batch);
                }
                Err(e) => {
                    failures += 1;
                    warn!(subreddit, error = %e, "Subreddit fetch failed");
                }
            }
        }

        if failures == self.subreddits.len() && !self.subreddits.is_empty() {
            return Err(FeedError::Network("all subreddits failed".to_string()));
        }

        Ok(articles)
    }
}
