//! record.rs: one ingested post with its extracted features.
//!
//! Identity and feature fields are fixed at creation. The front-page flag is
//! the only mutable state and it is owned by the ledger (false → true only).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Aggregate comment sentiment with its two failure modes kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum CommentSentiment {
    /// Mean of per-comment labels, in [-1, 1].
    Score(f64),
    /// No comments, or they could not be fetched.
    #[default]
    Unavailable,
    /// At least one comment body was malformed.
    Erroneous,
}

impl CommentSentiment {
    pub fn value(&self) -> Option<f64> {
        match self {
            CommentSentiment::Score(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub post_date: DateTime<Utc>,
    pub post_age_minutes: f64,
    pub title: String,
    pub author: Option<String>,
    pub author_link_karma: Option<i64>,
    pub author_comment_karma: Option<i64>,
    pub post_score: i64,
    pub post_upvote_ratio: f64,
    pub comment_sentiment: CommentSentiment,
    pub num_comments: u64,
    pub proj_score_60: Option<f64>,
    pub proj_score_90: Option<f64>,
    #[serde(default)]
    front_page_flag: bool,
}

impl Record {
    /// Numeric fields a model may use as drivers, in schema order.
    pub const FEATURE_NAMES: [&'static str; 9] = [
        "post_age_minutes",
        "author_link_karma",
        "author_comment_karma",
        "post_score",
        "post_upvote_ratio",
        "comment_sentiment",
        "num_comments",
        "proj_score_60",
        "proj_score_90",
    ];

    const NON_NUMERIC: [&'static str; 5] = ["url", "post_date", "title", "author", "front_page_flag"];

    /// Skeleton record; the extractor fills in the rest.
    pub fn new(url: impl Into<String>, title: impl Into<String>, post_date: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            post_date,
            post_age_minutes: 0.0,
            title: title.into(),
            author: None,
            author_link_karma: None,
            author_comment_karma: None,
            post_score: 0,
            post_upvote_ratio: 0.0,
            comment_sentiment: CommentSentiment::Unavailable,
            num_comments: 0,
            proj_score_60: None,
            proj_score_90: None,
            front_page_flag: false,
        }
    }

    pub fn is_on_front_page(&self) -> bool {
        self.front_page_flag
    }

    /// Only the ledger flips the flag. Returns true if the state changed.
    pub(crate) fn mark_front_page(&mut self) -> bool {
        let changed = !self.front_page_flag;
        self.front_page_flag = true;
        changed
    }

    /// Check a driver name against the schema without needing a record.
    pub fn check_driver(name: &str) -> Result<(), ConfigError> {
        if Self::FEATURE_NAMES.contains(&name) {
            Ok(())
        } else {
            Err(Self::schema_error(name))
        }
    }

    fn schema_error(name: &str) -> ConfigError {
        if Self::NON_NUMERIC.contains(&name) {
            ConfigError::NonNumericDriver(name.to_string())
        } else {
            ConfigError::UnknownDriver(name.to_string())
        }
    }

    /// Value of a numeric feature by name. `Ok(None)` is a null field.
    pub fn feature(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        let v = match name {
            "post_age_minutes" => Some(self.post_age_minutes),
            "author_link_karma" => self.author_link_karma.map(|k| k as f64),
            "author_comment_karma" => self.author_comment_karma.map(|k| k as f64),
            "post_score" => Some(self.post_score as f64),
            "post_upvote_ratio" => Some(self.post_upvote_ratio),
            "comment_sentiment" => self.comment_sentiment.value(),
            "num_comments" => Some(self.num_comments as f64),
            "proj_score_60" => self.proj_score_60,
            "proj_score_90" => self.proj_score_90,
            other => return Err(Self::schema_error(other)),
        };
        Ok(v)
    }
}
