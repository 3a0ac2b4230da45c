// src/feed/mod.rs
pub mod reddit;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One post as seen in a listing (new or hot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub permalink: String,
    pub title: String,
    /// `None` when the account was deleted or removed.
    pub author: Option<String>,
    pub flair: Option<String>,
    pub created_at: DateTime<Utc>,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
}

impl FeedItem {
    /// Age in fractional minutes at `now`. Negative if the clock is behind the feed.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 60_000.0
    }

    /// Creation time as unix seconds, the unit the projection drift term uses.
    pub fn created_ts(&self) -> f64 {
        self.created_at.timestamp_millis() as f64 / 1_000.0
    }
}

/// A resolved top-level comment. A missing body means the payload was malformed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorKarma {
    pub link_karma: i64,
    pub comment_karma: i64,
}

#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    /// Newest items carrying `flair`, newest first, at most `limit`.
    async fn recent_items(&self, flair: &str, limit: usize) -> Result<Vec<FeedItem>>;

    /// Currently hot items in rank order, at most `limit`.
    async fn hot_items(&self, limit: usize) -> Result<Vec<FeedItem>>;

    /// Top-level comments of `item`. Up to `expand_limit` collapsed threads are
    /// expanded; the rest are dropped.
    async fn comments(&self, item: &FeedItem, expand_limit: usize) -> Result<Vec<Comment>>;

    /// `Ok(None)` when the account no longer resolves.
    async fn author_karma(&self, author: &str) -> Result<Option<AuthorKarma>>;

    fn name(&self) -> &'static str;
}
