// src/extract.rs
//! Eligibility window, dedup against the ledger, and per-item feature assembly.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::WatchConfig;
use crate::feed::{FeedClient, FeedItem};
use crate::ledger::Ledger;
use crate::projection::Projector;
use crate::record::Record;
use crate::sentiment::{LabelThresholds, PolarityScorer, SentimentAggregator};

/// Half-open age window in minutes: `lower <= age < upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityWindow {
    pub lower_min: f64,
    pub upper_min: f64,
}

impl Default for EligibilityWindow {
    fn default() -> Self {
        Self {
            lower_min: 30.0,
            upper_min: 35.0,
        }
    }
}

impl EligibilityWindow {
    pub fn contains(&self, age_minutes: f64) -> bool {
        age_minutes >= self.lower_min && age_minutes < self.upper_min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Eligible { age_minutes: f64 },
    WrongFlair,
    OutsideWindow { age_minutes: f64 },
    /// Url already in the ledger or earlier in the same batch.
    Duplicate,
}

/// New records from one batch plus why the rest were skipped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub skipped_flair: usize,
    pub skipped_window: usize,
    pub skipped_duplicate: usize,
}

/// Cohort medians for both horizons; fetched at most once per batch.
#[derive(Debug, Clone, Copy, Default)]
struct Baseline {
    short: Option<f64>,
    long: Option<f64>,
}

pub struct FeatureExtractor {
    flair: String,
    window: EligibilityWindow,
    projector: Projector,
    sentiment: SentimentAggregator,
    horizon_short_min: f64,
    horizon_long_min: f64,
    cohort_size: usize,
}

impl FeatureExtractor {
    pub fn new(
        flair: impl Into<String>,
        window: EligibilityWindow,
        projector: Projector,
        sentiment: SentimentAggregator,
    ) -> Self {
        Self {
            flair: flair.into(),
            window,
            projector,
            sentiment,
            horizon_short_min: 60.0,
            horizon_long_min: 90.0,
            cohort_size: 25,
        }
    }

    pub fn from_config(cfg: &WatchConfig, scorer: Arc<dyn PolarityScorer>) -> Self {
        let x = &cfg.extract;
        let sentiment = SentimentAggregator::new(
            scorer,
            LabelThresholds::from(&cfg.sentiment),
            x.comment_expand_limit,
        );
        Self::new(
            x.flair.clone(),
            EligibilityWindow {
                lower_min: x.window_lower_min,
                upper_min: x.window_upper_min,
            },
            Projector::new(x.drift_divisor),
            sentiment,
        )
        .with_horizons(x.horizon_short_min, x.horizon_long_min)
        .with_cohort_size(x.cohort_size)
    }

    pub fn with_horizons(mut self, short_min: f64, long_min: f64) -> Self {
        self.horizon_short_min = short_min;
        self.horizon_long_min = long_min;
        self
    }

    pub fn with_cohort_size(mut self, n: usize) -> Self {
        self.cohort_size = n;
        self
    }

    pub fn flair(&self) -> &str {
        &self.flair
    }

    pub fn cohort_size(&self) -> usize {
        self.cohort_size
    }

    /// Tag first, then the age window, then dedup.
    pub fn check(
        &self,
        item: &FeedItem,
        now: DateTime<Utc>,
        ledger: &Ledger,
        seen: &HashSet<String>,
    ) -> Eligibility {
        if item.flair.as_deref() != Some(self.flair.as_str()) {
            return Eligibility::WrongFlair;
        }
        let age_minutes = item.age_minutes(now);
        if !self.window.contains(age_minutes) {
            return Eligibility::OutsideWindow { age_minutes };
        }
        if ledger.contains(&item.url) || seen.contains(&item.url) {
            return Eligibility::Duplicate;
        }
        Eligibility::Eligible { age_minutes }
    }

    /// Build records for every eligible item in `batch`. Collaborator failures
    /// degrade single fields; they never drop the item.
    pub async fn extract(
        &self,
        feed: &dyn FeedClient,
        batch: &[FeedItem],
        ledger: &Ledger,
        now: DateTime<Utc>,
    ) -> Extraction {
        let mut out = Extraction::default();
        let mut seen = HashSet::new();
        let mut baseline: Option<Baseline> = None;

        for item in batch {
            let age_minutes = match self.check(item, now, ledger, &seen) {
                Eligibility::Eligible { age_minutes } => age_minutes,
                Eligibility::WrongFlair => {
                    out.skipped_flair += 1;
                    continue;
                }
                Eligibility::OutsideWindow { age_minutes } => {
                    tracing::trace!(url = %item.url, age_minutes, "outside window");
                    out.skipped_window += 1;
                    continue;
                }
                Eligibility::Duplicate => {
                    tracing::debug!(url = %item.url, "already ingested");
                    out.skipped_duplicate += 1;
                    continue;
                }
            };
            seen.insert(item.url.clone());

            let base = match baseline {
                Some(b) => b,
                None => {
                    let b = self.fetch_baseline(feed, now).await;
                    baseline = Some(b);
                    b
                }
            };
            out.records
                .push(self.build_record(feed, item, age_minutes, base, now).await);
        }
        out
    }

    async fn fetch_baseline(&self, feed: &dyn FeedClient, now: DateTime<Utc>) -> Baseline {
        match feed.hot_items(self.cohort_size).await {
            Ok(cohort) => {
                let cohort = &cohort[..cohort.len().min(self.cohort_size)];
                Baseline {
                    short: self
                        .projector
                        .cohort_median(cohort, now, self.horizon_short_min),
                    long: self
                        .projector
                        .cohort_median(cohort, now, self.horizon_long_min),
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, "cohort fetch failed; projections unavailable");
                metrics::counter!("watch_feed_errors_total", "call" => "hot").increment(1);
                Baseline::default()
            }
        }
    }

    async fn build_record(
        &self,
        feed: &dyn FeedClient,
        item: &FeedItem,
        age_minutes: f64,
        baseline: Baseline,
        now: DateTime<Utc>,
    ) -> Record {
        let mut r = Record::new(item.url.clone(), item.title.clone(), item.created_at);
        r.post_age_minutes = age_minutes;
        r.author = item.author.clone();
        r.post_score = item.score;
        r.post_upvote_ratio = item.upvote_ratio;
        r.num_comments = item.num_comments;

        if let Some(author) = item.author.as_deref() {
            match feed.author_karma(author).await {
                Ok(Some(k)) => {
                    r.author_link_karma = Some(k.link_karma);
                    r.author_comment_karma = Some(k.comment_karma);
                }
                Ok(None) => tracing::debug!(author, "author no longer resolves"),
                Err(e) => {
                    tracing::warn!(error = ?e, author, "author lookup failed");
                    metrics::counter!("watch_feed_errors_total", "call" => "author").increment(1);
                }
            }
        }

        r.comment_sentiment = self.sentiment.resolve(feed, item).await;
        r.proj_score_60 = self
            .projector
            .relative(item, now, self.horizon_short_min, baseline.short);
        r.proj_score_90 = self
            .projector
            .relative(item, now, self.horizon_long_min, baseline.long);
        r
    }
}
