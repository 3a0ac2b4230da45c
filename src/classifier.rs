//! Classifier adapter: model abstraction + driver-vector assembly.
//!
//! The model itself is a black box behind `Classifier`. The adapter owns the
//! driver list and is the only place that turns a `Record` into a vector.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::watch::ModelCfg;
use crate::error::{ConfigError, ScoreError};
use crate::record::Record;

/// Trained model contract: ordered feature vector in, P(front page) out.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;

    /// Input width the model was trained on, if known.
    fn expected_features(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Logistic regression exported as plain JSON:
/// `{"intercept": -1.2, "coefficients": [0.8]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading model from {}", path.display()))?;
        let model: LogisticModel =
            serde_json::from_str(&data).context("parsing logistic model json")?;
        if model.coefficients.is_empty() {
            anyhow::bail!("model at {} has no coefficients", path.display());
        }
        Ok(model)
    }
}

impl Classifier for LogisticModel {
    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(anyhow!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            ));
        }
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>();
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn expected_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn name(&self) -> &'static str {
        "logistic"
    }
}

/// Outcome of scoring one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Score {
    /// No model configured.
    Disabled,
    /// This driver's value was null; the record cannot be scored.
    MissingValue(String),
    Probability(f64),
}

pub struct ClassifierAdapter {
    model: Option<DynClassifier>,
    drivers: Vec<String>,
    threshold: f64,
}

impl ClassifierAdapter {
    /// Validates drivers against the record schema and the model width.
    pub fn new(
        model: DynClassifier,
        drivers: Vec<String>,
        threshold: f64,
    ) -> Result<Self, ConfigError> {
        if drivers.is_empty() {
            return Err(ConfigError::NoDrivers);
        }
        for d in &drivers {
            Record::check_driver(d)?;
        }
        if let Some(expected) = model.expected_features() {
            if expected != drivers.len() {
                return Err(ConfigError::DriverCount {
                    expected,
                    got: drivers.len(),
                });
            }
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold.to_string()));
        }
        Ok(Self {
            model: Some(model),
            drivers,
            threshold,
        })
    }

    /// Skips driver validation; lets tests reach the score-time schema check.
    #[cfg(test)]
    pub(crate) fn unchecked(model: DynClassifier, drivers: Vec<String>, threshold: f64) -> Self {
        Self {
            model: Some(model),
            drivers,
            threshold,
        }
    }

    /// No model: every record is "not predicted".
    pub fn disabled() -> Self {
        Self {
            model: None,
            drivers: Vec::new(),
            threshold: 1.0,
        }
    }

    /// Build from config: disabled unless `model.enabled`, otherwise load the
    /// JSON model from `model.path`.
    pub fn from_config(cfg: &ModelCfg) -> Result<Self> {
        if !cfg.enabled {
            return Ok(Self::disabled());
        }
        let model = LogisticModel::load_from_file(&cfg.path)?;
        tracing::info!(
            path = %cfg.path.display(),
            drivers = ?cfg.drivers,
            threshold = cfg.probability_threshold,
            "model loaded"
        );
        Ok(Self::new(
            Arc::new(model),
            cfg.drivers.clone(),
            cfg.probability_threshold,
        )?)
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }

    /// Driver values in driver order; nulls stay `None`.
    pub fn feature_vector(&self, record: &Record) -> Result<Vec<Option<f64>>, ConfigError> {
        self.drivers.iter().map(|d| record.feature(d)).collect()
    }

    /// Score one record. Schema drift fails fast; a null driver value means
    /// the record is simply not scored.
    pub fn score(&self, record: &Record) -> Result<Score, ScoreError> {
        let Some(model) = &self.model else {
            return Ok(Score::Disabled);
        };
        let values = self.feature_vector(record)?;
        let mut x = Vec::with_capacity(values.len());
        for (name, v) in self.drivers.iter().zip(values) {
            match v {
                Some(v) => x.push(v),
                None => return Ok(Score::MissingValue(name.clone())),
            }
        }
        let p = model
            .predict_proba(&x)
            .with_context(|| format!("{} model on {}", model.name(), record.url))
            .map_err(ScoreError::Model)?;
        Ok(Score::Probability(p))
    }

    /// Strictly above the threshold.
    pub fn is_predicted(&self, score: &Score) -> bool {
        matches!(score, Score::Probability(p) if *p > self.threshold)
    }
}
