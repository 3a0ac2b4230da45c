//! Typed errors for the parts of the pipeline that callers branch on.
//! Collaborator I/O stays on `anyhow`; these are the cases the orchestrator and
//! the scheduler must tell apart.

use thiserror::Error;

/// Mismatch between the configured model/driver list and the record schema.
/// Always fatal: scoring on the wrong features is worse than not scoring.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("driver `{0}` is not a record field")]
    UnknownDriver(String),

    #[error("driver `{0}` is a record field but not numeric")]
    NonNumericDriver(String),

    #[error("model is enabled but no drivers are configured")]
    NoDrivers,

    #[error("model expects {expected} features, {got} drivers configured")]
    DriverCount { expected: usize, got: usize },

    #[error("probability threshold {0} is outside [0, 1]")]
    Threshold(String),

    #[error("invalid setting `{key}`: {reason}")]
    Setting { key: &'static str, reason: String },
}

/// Scoring a single record failed.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("model inference failed: {0:#}")]
    Model(anyhow::Error),
}

/// Why a scrape cycle stopped early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feed unavailable: {0:#}")]
    Feed(anyhow::Error),
}

impl CycleError {
    /// Fatal errors stop the schedule; everything else waits for the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CycleError::Config(_))
    }
}
