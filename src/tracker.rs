//! tracker.rs: front-page detection over the ledger.
//!
//! Per record: unobserved → flagged on first sighting in a hot snapshot; no
//! way back. The tracker remembers which urls were flagged at its previous
//! scan so each call reports only the new arrivals.

use std::collections::{BTreeSet, HashSet};

use crate::feed::FeedItem;
use crate::ledger::Ledger;

#[derive(Debug, Default)]
pub struct FrontPageTracker {
    previous: BTreeSet<String>,
}

impl FrontPageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from urls already flagged, so they are not reported again.
    pub fn seeded(previous: BTreeSet<String>) -> Self {
        Self { previous }
    }

    /// Flag every ledger record present in `snapshot`, then return the urls
    /// flagged now but not at the previous scan, in ledger order.
    pub fn scan(&mut self, ledger: &mut Ledger, snapshot: &[FeedItem]) -> Vec<String> {
        let hot: HashSet<&str> = snapshot.iter().map(|it| it.url.as_str()).collect();
        for url in hot {
            if ledger.mark_front_page(url) {
                tracing::debug!(url = %url, "reached front page");
            }
        }

        let delta: Vec<String> = ledger
            .iter()
            .filter(|r| r.is_on_front_page() && !self.previous.contains(&r.url))
            .map(|r| r.url.clone())
            .collect();

        self.previous = ledger.flagged_ids().clone();
        delta
    }

    /// Urls known to be flagged as of the last scan.
    pub fn previous(&self) -> &BTreeSet<String> {
        &self.previous
    }
}

/// `current − previous`, the set form of what `scan` reports.
pub fn flagged_delta(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> BTreeSet<String> {
    current.difference(previous).cloned().collect()
}
