// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod projection;
pub mod record;
pub mod schedule;
pub mod sentiment;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::classifier::{Classifier, ClassifierAdapter, LogisticModel, Score};
pub use crate::config::WatchConfig;
pub use crate::error::{ConfigError, CycleError, ScoreError};
pub use crate::feed::{AuthorKarma, Comment, FeedClient, FeedItem};
pub use crate::ledger::Ledger;
pub use crate::notify::{Alert, AlertEntry, AlertKind, Notifier, NotifierMux};
pub use crate::orchestrator::{CycleReport, Orchestrator, Prediction, ScrapeSession};
pub use crate::record::{CommentSentiment, Record};
