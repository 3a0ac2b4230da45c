// tests/common/mod.rs
// Shared mock collaborators for the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use frontpage_watch::classifier::{Classifier, ClassifierAdapter};
use frontpage_watch::extract::{EligibilityWindow, FeatureExtractor};
use frontpage_watch::feed::{AuthorKarma, Comment, FeedClient, FeedItem};
use frontpage_watch::notify::{Alert, Notifier};
use frontpage_watch::projection::Projector;
use frontpage_watch::sentiment::{LabelThresholds, PolarityScorer, PolarityScores, SentimentAggregator};
use frontpage_watch::Orchestrator;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 15, 0, 0).unwrap()
}

pub fn url(id: &str) -> String {
    format!("https://www.reddit.com/r/wallstreetbets/comments/{id}/")
}

/// A post `age_min` minutes old at `now`.
pub fn item(id: &str, flair: &str, age_min: f64, score: i64, now: DateTime<Utc>) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        url: url(id),
        permalink: format!("/r/wallstreetbets/comments/{id}/"),
        title: format!("post {id}"),
        author: Some(format!("author_{id}")),
        flair: Some(flair.to_string()),
        created_at: now - Duration::milliseconds((age_min * 60_000.0).round() as i64),
        score,
        upvote_ratio: 0.9,
        num_comments: 3,
    }
}

#[derive(Default)]
pub struct MockFeed {
    pub recent: Mutex<Vec<FeedItem>>,
    pub hot: Mutex<Vec<FeedItem>>,
    pub comments: Mutex<HashMap<String, Vec<Comment>>>,
    pub fail_recent: AtomicBool,
    pub fail_hot: AtomicBool,
    pub fail_comments: AtomicBool,
}

impl MockFeed {
    pub fn new(recent: Vec<FeedItem>, hot: Vec<FeedItem>) -> Self {
        let f = Self::default();
        *f.recent.lock().unwrap() = recent;
        *f.hot.lock().unwrap() = hot;
        f
    }

    pub fn set_comments(&self, url: &str, bodies: Vec<Option<&str>>) {
        let comments = bodies
            .into_iter()
            .enumerate()
            .map(|(i, b)| Comment {
                id: format!("c{i}"),
                body: b.map(String::from),
            })
            .collect();
        self.comments.lock().unwrap().insert(url.to_string(), comments);
    }
}

#[async_trait::async_trait]
impl FeedClient for MockFeed {
    // Returns the listing unfiltered; the extractor owns the flair check.
    async fn recent_items(&self, _flair: &str, limit: usize) -> Result<Vec<FeedItem>> {
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(anyhow!("recent listing down"));
        }
        Ok(self.recent.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn hot_items(&self, limit: usize) -> Result<Vec<FeedItem>> {
        if self.fail_hot.load(Ordering::SeqCst) {
            return Err(anyhow!("hot listing down"));
        }
        Ok(self.hot.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn comments(&self, item: &FeedItem, _expand_limit: usize) -> Result<Vec<Comment>> {
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(anyhow!("comments down"));
        }
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&item.url)
            .cloned()
            .unwrap_or_default())
    }

    async fn author_karma(&self, author: &str) -> Result<Option<AuthorKarma>> {
        if author.starts_with("gone_") {
            return Ok(None);
        }
        Ok(Some(AuthorKarma {
            link_karma: 1_000,
            comment_karma: 5_000,
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Reads the compound score straight out of the comment body ("0.35").
pub struct NumericScorer;

impl PolarityScorer for NumericScorer {
    fn polarity(&self, text: &str) -> PolarityScores {
        let compound = text.trim().parse::<f64>().unwrap_or(0.0);
        PolarityScores {
            compound,
            ..PolarityScores::neutral()
        }
    }
}

/// Always answers the same probability.
pub struct FixedClassifier(pub f64);

impl Classifier for FixedClassifier {
    fn predict_proba(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.0)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(
        "DD",
        EligibilityWindow::default(),
        Projector::default(),
        SentimentAggregator::new(Arc::new(NumericScorer), LabelThresholds::default(), 10),
    )
}

pub fn classifier(p: f64) -> ClassifierAdapter {
    ClassifierAdapter::new(Arc::new(FixedClassifier(p)), vec!["proj_score_60".into()], 0.5)
        .unwrap()
}

pub fn orchestrator(
    feed: Arc<MockFeed>,
    notifier: Arc<RecordingNotifier>,
    classifier: ClassifierAdapter,
) -> Orchestrator {
    Orchestrator::new(feed, notifier, classifier, extractor())
}
