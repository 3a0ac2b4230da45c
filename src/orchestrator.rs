// src/orchestrator.rs
//! One scrape cycle: pull the newest flaired posts, build records, score them,
//! append to the ledger, look at the front page, send alerts.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::{ClassifierAdapter, Score};
use crate::config::WatchConfig;
use crate::error::{CycleError, ScoreError};
use crate::extract::{Extraction, FeatureExtractor};
use crate::feed::FeedClient;
use crate::ledger::Ledger;
use crate::notify::{Alert, AlertEntry, Notifier};
use crate::sentiment::PolarityScorer;
use crate::tracker::FrontPageTracker;

/// Everything that must survive between cycles.
#[derive(Debug, Default)]
pub struct ScrapeSession {
    ledger: Ledger,
    tracker: FrontPageTracker,
}

impl ScrapeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from an existing ledger. Records it already has flagged count
    /// as seen by the tracker.
    pub fn with_ledger(ledger: Ledger) -> Self {
        let tracker = FrontPageTracker::seeded(ledger.flagged_ids().clone());
        Self { ledger, tracker }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tracker(&self) -> &FrontPageTracker {
        &self.tracker
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub url: String,
    pub title: String,
    pub probability: f64,
}

/// What one cycle (or the final check) did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub ingested: usize,
    pub predicted: Vec<Prediction>,
    /// Urls flagged in this cycle, ledger order.
    pub newly_flagged: Vec<String>,
    /// Records appended without a probability (null driver or model failure).
    pub unscored: usize,
    pub skipped_flair: usize,
    pub skipped_window: usize,
    pub skipped_duplicate: usize,
}

pub struct Orchestrator {
    feed: Arc<dyn FeedClient>,
    notifier: Arc<dyn Notifier>,
    classifier: ClassifierAdapter,
    extractor: FeatureExtractor,
    alerts_enabled: bool,
    batch_limit: usize,
    community: Option<String>,
    session: ScrapeSession,
}

impl Orchestrator {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        notifier: Arc<dyn Notifier>,
        classifier: ClassifierAdapter,
        extractor: FeatureExtractor,
    ) -> Self {
        Self {
            feed,
            notifier,
            classifier,
            extractor,
            alerts_enabled: true,
            batch_limit: 100,
            community: None,
            session: ScrapeSession::new(),
        }
    }

    pub fn from_config(
        cfg: &WatchConfig,
        feed: Arc<dyn FeedClient>,
        notifier: Arc<dyn Notifier>,
        classifier: ClassifierAdapter,
        scorer: Arc<dyn PolarityScorer>,
    ) -> Self {
        Self::new(
            feed,
            notifier,
            classifier,
            FeatureExtractor::from_config(cfg, scorer),
        )
        .with_alerts(cfg.alerts.enabled)
        .with_batch_limit(cfg.extract.batch_limit)
        .with_community(cfg.feed.subreddit.clone())
    }

    pub fn with_alerts(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Subreddit named in alert headers.
    pub fn with_community(mut self, name: impl Into<String>) -> Self {
        self.community = Some(name.into());
        self
    }

    pub fn with_session(mut self, session: ScrapeSession) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &ScrapeSession {
        &self.session
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// A scoring configuration error aborts the cycle before anything is
    /// appended. Listing failures only cost this cycle's ingestion; the
    /// cycle fails only when neither listing answers.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        counter!("watch_cycles_total", "kind" => "scrape").increment(1);
        let mut report = CycleReport::default();

        let recent = match self
            .feed
            .recent_items(self.extractor.flair(), self.batch_limit)
            .await
        {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(error = ?e, feed = self.feed.name(), "recent listing failed; skipping ingestion");
                counter!("watch_feed_errors_total", "call" => "recent").increment(1);
                None
            }
        };

        if let Some(batch) = &recent {
            let extraction = self
                .extractor
                .extract(self.feed.as_ref(), batch, &self.session.ledger, now)
                .await;
            self.ingest(extraction, &mut report)?;
        }

        let hot_failed = match self.feed.hot_items(self.extractor.cohort_size()).await {
            Ok(snapshot) => {
                report.newly_flagged = self
                    .session
                    .tracker
                    .scan(&mut self.session.ledger, &snapshot);
                None
            }
            Err(e) => {
                tracing::warn!(error = ?e, "hot listing failed; front page not checked");
                counter!("watch_feed_errors_total", "call" => "hot").increment(1);
                Some(e)
            }
        };
        if let (None, Some(e)) = (&recent, hot_failed) {
            return Err(CycleError::Feed(e.context("recent and hot listings both failed")));
        }

        counter!("watch_front_page_total").increment(report.newly_flagged.len() as u64);
        gauge!("watch_ledger_records").set(self.session.ledger.len() as f64);

        if self.alerts_enabled {
            self.send_predicted(&report.predicted, now).await;
            self.send_front_page(&report.newly_flagged, now).await;
        }

        histogram!("watch_cycle_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(report)
    }

    /// Score every new record first, then append them all. Nothing touches
    /// the ledger if any record hits a configuration error.
    fn ingest(&mut self, extraction: Extraction, report: &mut CycleReport) -> Result<(), CycleError> {
        report.skipped_flair = extraction.skipped_flair;
        report.skipped_window = extraction.skipped_window;
        report.skipped_duplicate = extraction.skipped_duplicate;
        counter!("watch_items_skipped_total", "reason" => "flair")
            .increment(extraction.skipped_flair as u64);
        counter!("watch_items_skipped_total", "reason" => "window")
            .increment(extraction.skipped_window as u64);
        counter!("watch_items_skipped_total", "reason" => "duplicate")
            .increment(extraction.skipped_duplicate as u64);

        let mut predicted = Vec::new();
        for record in &extraction.records {
            let score = match self.classifier.score(record) {
                Ok(s) => s,
                // Drivers are validated at startup; this catches a record schema
                // that no longer matches them.
                Err(ScoreError::Config(e)) => {
                    tracing::error!(error = %e, url = %record.url, "classifier configuration does not match records");
                    return Err(CycleError::Config(e));
                }
                Err(ScoreError::Model(e)) => {
                    tracing::warn!(error = ?e, url = %record.url, "scoring failed; not predicted");
                    report.unscored += 1;
                    continue;
                }
            };
            match &score {
                Score::Probability(p) if self.classifier.is_predicted(&score) => {
                    predicted.push(Prediction {
                        url: record.url.clone(),
                        title: record.title.clone(),
                        probability: *p,
                    });
                }
                Score::MissingValue(driver) => {
                    tracing::warn!(url = %record.url, driver = %driver, "driver value missing; not predicted");
                    report.unscored += 1;
                }
                _ => {}
            }
        }

        for record in extraction.records {
            if self.session.ledger.insert(record) {
                report.ingested += 1;
            }
        }
        report.predicted = predicted;

        counter!("watch_records_ingested_total").increment(report.ingested as u64);
        counter!("watch_predicted_total").increment(report.predicted.len() as u64);
        tracing::info!(
            ingested = report.ingested,
            predicted = report.predicted.len(),
            ledger = self.session.ledger.len(),
            "Scraped {} new {} posts",
            report.ingested,
            self.extractor.flair()
        );
        Ok(())
    }

    pub async fn run_final_check(&mut self) -> Result<CycleReport, CycleError> {
        self.run_final_check_at(Utc::now()).await
    }

    /// Tracker only: no ingestion, no scoring.
    pub async fn run_final_check_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        counter!("watch_cycles_total", "kind" => "final").increment(1);
        let snapshot = match self.feed.hot_items(self.extractor.cohort_size()).await {
            Ok(s) => s,
            Err(e) => {
                counter!("watch_feed_errors_total", "call" => "hot").increment(1);
                return Err(CycleError::Feed(e.context("hot listing for final check")));
            }
        };
        let newly_flagged = self
            .session
            .tracker
            .scan(&mut self.session.ledger, &snapshot);
        counter!("watch_front_page_total").increment(newly_flagged.len() as u64);
        tracing::info!(
            newly_flagged = newly_flagged.len(),
            flagged_total = self.session.ledger.flagged_ids().len(),
            "final front page check"
        );
        if self.alerts_enabled {
            self.send_front_page(&newly_flagged, now).await;
        }
        Ok(CycleReport {
            newly_flagged,
            ..CycleReport::default()
        })
    }

    async fn send_predicted(&self, predicted: &[Prediction], now: DateTime<Utc>) {
        if predicted.is_empty() {
            return;
        }
        let entries = predicted
            .iter()
            .map(|p| AlertEntry {
                title: p.title.clone(),
                url: p.url.clone(),
                probability: Some(p.probability),
            })
            .collect();
        self.deliver(Alert::predicted(entries, now)).await;
    }

    async fn send_front_page(&self, urls: &[String], now: DateTime<Utc>) {
        if urls.is_empty() {
            return;
        }
        let entries = urls
            .iter()
            .filter_map(|u| self.session.ledger.get(u))
            .map(|r| AlertEntry {
                title: r.title.clone(),
                url: r.url.clone(),
                probability: None,
            })
            .collect();
        self.deliver(Alert::front_page(entries, now)).await;
    }

    async fn deliver(&self, mut alert: Alert) {
        if alert.community.is_none() {
            alert.community = self.community.clone();
        }
        if let Err(e) = self.notifier.send(&alert).await {
            tracing::warn!(error = ?e, kind = ?alert.kind, notifier = self.notifier.name(), "alert not delivered");
        }
    }
}
