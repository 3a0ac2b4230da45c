// src/config/watch.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::ConfigError;
use crate::record::Record;

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";
const DEFAULT_TOML: &str = "config/watch.toml";
const DEFAULT_JSON: &str = "config/watch.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedCfg {
    pub subreddit: String,
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            subreddit: "wallstreetbets".into(),
            base_url: "https://www.reddit.com".into(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleCfg {
    pub interval_secs: u64,
    /// Local wall-clock time ("HH:MM") after which no new cycle starts.
    pub end_time: String,
    /// Minutes after `end_time` for the tracker-only final check.
    pub final_check_delay_mins: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            end_time: "21:30".into(),
            final_check_delay_mins: 90,
        }
    }
}

impl ScheduleCfg {
    pub fn end_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.end_time.trim(), "%H:%M").map_err(|e| {
            ConfigError::Setting {
                key: "schedule.end_time",
                reason: format!("{:?}: {e}", self.end_time),
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractCfg {
    pub flair: String,
    pub batch_limit: usize,
    pub window_lower_min: f64,
    pub window_upper_min: f64,
    pub cohort_size: usize,
    pub comment_expand_limit: usize,
    pub horizon_short_min: f64,
    pub horizon_long_min: f64,
    pub drift_divisor: f64,
}

impl Default for ExtractCfg {
    fn default() -> Self {
        Self {
            flair: "DD".into(),
            batch_limit: 100,
            window_lower_min: 30.0,
            window_upper_min: 35.0,
            cohort_size: 25,
            comment_expand_limit: 10,
            horizon_short_min: 60.0,
            horizon_long_min: 90.0,
            drift_divisor: 45_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentCfg {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
}

impl Default for SentimentCfg {
    fn default() -> Self {
        Self {
            positive_threshold: 0.1,
            negative_threshold: -0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsCfg {
    pub enabled: bool,
}

impl Default for AlertsCfg {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelCfg {
    pub enabled: bool,
    pub path: PathBuf,
    pub drivers: Vec<String>,
    pub probability_threshold: f64,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("config/model.json"),
            drivers: vec!["proj_score_60".into()],
            probability_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    pub feed: FeedCfg,
    pub schedule: ScheduleCfg,
    pub extract: ExtractCfg,
    pub sentiment: SentimentCfg,
    pub alerts: AlertsCfg,
    pub model: ModelCfg,
    /// e.g. "127.0.0.1:9184"; metrics endpoint is off when unset.
    pub metrics_addr: Option<String>,
}

impl WatchConfig {
    /// Load from an explicit path (TOML or JSON by extension), then env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watch config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)?;
        cfg.apply_env_overrides()?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $WATCH_CONFIG_PATH
    /// 2) config/watch.toml
    /// 3) config/watch.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in [DEFAULT_TOML, DEFAULT_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Environment wins over the file for the knobs operators flip most often.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_str("WATCH_SUBREDDIT") {
            self.feed.subreddit = v;
        }
        if let Some(v) = env_str("WATCH_FEED_BASE_URL") {
            self.feed.base_url = v;
        }
        if let Some(v) = env_str("WATCH_USER_AGENT") {
            self.feed.user_agent = v;
        }
        if let Some(v) = env_parse::<u64>("WATCH_INTERVAL_SECS")? {
            self.schedule.interval_secs = v;
        }
        if let Some(v) = env_str("WATCH_END_TIME") {
            self.schedule.end_time = v;
        }
        if let Some(v) = env_str("WATCH_FLAIR") {
            self.extract.flair = v;
        }
        if let Some(v) = env_str("WATCH_ALERTS") {
            self.alerts.enabled = parse_flag(&v);
        }
        if let Some(v) = env_str("WATCH_MODEL_ENABLED") {
            self.model.enabled = parse_flag(&v);
        }
        if let Some(v) = env_str("WATCH_MODEL_PATH") {
            self.model.path = PathBuf::from(v);
        }
        if let Some(v) = env_str("WATCH_MODEL_DRIVERS") {
            self.model.drivers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = env_parse::<f64>("WATCH_PROB_THRESHOLD")? {
            self.model.probability_threshold = v;
        }
        if let Some(v) = env_str("WATCH_METRICS_ADDR") {
            self.metrics_addr = Some(v);
        }
        Ok(())
    }

    /// Repair values that have an obvious safe fallback.
    pub fn sanitize(&mut self) {
        let d = ExtractCfg::default();
        if self.schedule.interval_secs == 0 {
            self.schedule.interval_secs = ScheduleCfg::default().interval_secs;
        }
        if self.feed.timeout_secs == 0 {
            self.feed.timeout_secs = FeedCfg::default().timeout_secs;
        }
        if self.extract.batch_limit == 0 {
            self.extract.batch_limit = d.batch_limit;
        }
        if self.extract.cohort_size == 0 {
            self.extract.cohort_size = d.cohort_size;
        }
        if !(self.extract.drift_divisor.is_finite() && self.extract.drift_divisor > 0.0) {
            self.extract.drift_divisor = d.drift_divisor;
        }
        if self.extract.window_lower_min > self.extract.window_upper_min {
            // swap to keep a valid interval
            std::mem::swap(
                &mut self.extract.window_lower_min,
                &mut self.extract.window_upper_min,
            );
        }
        if self.sentiment.negative_threshold > self.sentiment.positive_threshold {
            std::mem::swap(
                &mut self.sentiment.negative_threshold,
                &mut self.sentiment.positive_threshold,
            );
        }
        self.model.drivers.retain(|d| !d.trim().is_empty());
    }

    /// Checks that have no safe fallback. Run once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.end_time()?;
        if !(self.extract.window_lower_min > 0.0) {
            return Err(ConfigError::Setting {
                key: "extract.window_lower_min",
                reason: "must be positive so post age is never zero".into(),
            });
        }
        if !(self.extract.horizon_short_min > 0.0 && self.extract.horizon_long_min > 0.0) {
            return Err(ConfigError::Setting {
                key: "extract.horizon_*_min",
                reason: "horizons must be positive".into(),
            });
        }
        if self.model.enabled {
            if !(0.0..=1.0).contains(&self.model.probability_threshold) {
                return Err(ConfigError::Threshold(
                    self.model.probability_threshold.to_string(),
                ));
            }
            if self.model.drivers.is_empty() {
                return Err(ConfigError::NoDrivers);
            }
            for d in &self.model.drivers {
                Record::check_driver(d)?;
            }
        }
        Ok(())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing watch config json");
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        // Fallback: unknown extension may still hold JSON
        Err(toml_err) if hint_ext != "toml" => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported watch config format: {toml_err}")),
        Err(e) => Err(e).context("parsing watch config toml"),
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_str(key) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{key}={v:?}: {e}")),
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(
        v.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_tuned_constants() {
        let cfg = WatchConfig::default();
        assert_eq!(cfg.extract.window_lower_min, 30.0);
        assert_eq!(cfg.extract.window_upper_min, 35.0);
        assert_eq!(cfg.extract.drift_divisor, 45_000.0);
        assert_eq!(cfg.extract.cohort_size, 25);
        assert_eq!(cfg.schedule.interval_secs, 300);
        assert_eq!(cfg.model.drivers, vec!["proj_score_60".to_string()]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = parse_config(
            r#"
            [extract]
            window_upper_min = 40.0
            [model]
            enabled = true
            drivers = ["proj_score_60", "comment_sentiment"]
            "#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.extract.window_upper_min, 40.0);
        assert_eq!(cfg.extract.window_lower_min, 30.0);
        assert_eq!(cfg.model.drivers.len(), 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn sanitize_swaps_inverted_bounds() {
        let mut cfg = WatchConfig::default();
        cfg.extract.window_lower_min = 35.0;
        cfg.extract.window_upper_min = 30.0;
        cfg.sentiment.positive_threshold = -0.2;
        cfg.sentiment.negative_threshold = 0.2;
        cfg.extract.drift_divisor = 0.0;
        cfg.sanitize();
        assert_eq!(cfg.extract.window_lower_min, 30.0);
        assert_eq!(cfg.sentiment.positive_threshold, 0.2);
        assert_eq!(cfg.extract.drift_divisor, 45_000.0);
    }

    #[test]
    fn unknown_driver_fails_validation() {
        let mut cfg = WatchConfig::default();
        cfg.model.enabled = true;
        cfg.model.drivers = vec!["proj_rscore_prem_60".into()];
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UnknownDriver("proj_rscore_prem_60".into()))
        );
    }

    #[test]
    fn bad_end_time_fails_validation() {
        let mut cfg = WatchConfig::default();
        cfg.schedule.end_time = "half past nine".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Setting { key: "schedule.end_time", .. })
        ));
    }
}
