//! News and social text feeds.
//!
//! Everything the sentiment path reads arrives as an [`Article`]: RSS news
//! items and Reddit posts are mapped into the same shape so the scorer does
//! not care where text came from.

mod google_news;
mod reddit;

pub use google_news::GoogleNewsFeed;
pub use reddit::RedditFeed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Article Record
// ============================================================================

/// One article-like record from any text source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Headline
    pub title: String,
    /// Canonical link (also the dedup key)
    pub link: String,
    /// Publish time; feeds without one get the fetch time
    pub published: DateTime<Utc>,
    /// Human-readable source label (e.g. "Google News", "Reddit: r/IndianStreetBets")
    pub source: String,
    /// Short body excerpt
    pub snippet: String,
}

/// Errors from a text feed.
///
/// Like provider errors these are always recoverable: a failed feed
/// contributes zero articles and the scan continues.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ============================================================================
// Feed Trait
// ============================================================================

/// A source of article records.
#[async_trait]
pub trait ArticleFeed: Send + Sync {
    /// Short label for logs and the debug trace.
    fn name(&self) -> &str;

    /// Fetch the current batch of articles.
    async fn fetch(&self) -> Result<Vec<Article>, FeedError>;
}

/// Merge articles from several batches, dropping duplicate links.
///
/// First occurrence wins, input order is preserved.
pub fn dedup_by_link(batches: Vec<Vec<Article>>) -> Vec<Article> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();

    for batch in batches {
        for article in batch {
            if seen.insert(article.link.clone()) {
                merged.push(article);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str) -> Article {
        Article {
            title: format!("title {link}"),
            link: link.to_string(),
            published: Utc::now(),
            source: "test".to_string(),
            snippet: String::new(),
        }
    }

    #[test]
    fn test_dedup_by_link_keeps_first() {
        let merged = dedup_by_link(vec![
            vec![article("a"), article("b")],
            vec![article("b"), article("c")],
        ]);

        let links: Vec<&str> = merged.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(links, vec!["a", "b", "c"]);
        assert_eq!(merged[1].title, "title b");
    }
}
