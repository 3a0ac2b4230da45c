//! # Popularity projection
//! Extrapolates a post's score to a future horizon on a log scale, plus a
//! slow drift term from its creation time, and compares it with the median
//! projection of the currently hot cohort.
//!
//! `projection = created_ts / K + log10(max(score / age_min * horizon, 1))`
//!
//! `K` and the horizons are tuned constants, not derived values.

use chrono::{DateTime, Utc};

use crate::feed::FeedItem;

pub const DEFAULT_DRIFT_DIVISOR: f64 = 45_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    drift_divisor: f64,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_DIVISOR)
    }
}

impl Projector {
    pub fn new(drift_divisor: f64) -> Self {
        Self { drift_divisor }
    }

    /// `None` when the age is not a positive finite number (the result would be undefined).
    pub fn project(
        &self,
        score: i64,
        age_minutes: f64,
        created_ts: f64,
        horizon_min: f64,
    ) -> Option<f64> {
        if !(age_minutes.is_finite() && age_minutes > 0.0) {
            return None;
        }
        let rate = score as f64 / age_minutes * horizon_min;
        Some(created_ts / self.drift_divisor + rate.max(1.0).log10())
    }

    pub fn project_item(&self, item: &FeedItem, now: DateTime<Utc>, horizon_min: f64) -> Option<f64> {
        self.project(item.score, item.age_minutes(now), item.created_ts(), horizon_min)
    }

    /// Median projection over the cohort at `horizon_min`. Items with an
    /// undefined projection are left out; an empty cohort gives `None`.
    pub fn cohort_median(
        &self,
        cohort: &[FeedItem],
        now: DateTime<Utc>,
        horizon_min: f64,
    ) -> Option<f64> {
        let values: Vec<f64> = cohort
            .iter()
            .filter_map(|it| self.project_item(it, now, horizon_min))
            .collect();
        median(values)
    }

    /// Item projection minus cohort median: positive means the item is on
    /// track to beat the typical hot post at that horizon.
    pub fn relative(
        &self,
        item: &FeedItem,
        now: DateTime<Utc>,
        horizon_min: f64,
        cohort_median: Option<f64>,
    ) -> Option<f64> {
        Some(self.project_item(item, now, horizon_min)? - cohort_median?)
    }
}

/// Median with the two middle values averaged for even lengths.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
