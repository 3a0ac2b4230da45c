// tests/config_load.rs
use frontpage_watch::config::watch::ENV_CONFIG_PATH;
use frontpage_watch::{ConfigError, WatchConfig};
use serial_test::serial;
use std::{env, fs};

// every key `apply_env_overrides` reads, plus the path switch
const ENV_KEYS: [&str; 13] = [
    ENV_CONFIG_PATH,
    "WATCH_SUBREDDIT",
    "WATCH_FEED_BASE_URL",
    "WATCH_USER_AGENT",
    "WATCH_INTERVAL_SECS",
    "WATCH_END_TIME",
    "WATCH_FLAIR",
    "WATCH_ALERTS",
    "WATCH_MODEL_ENABLED",
    "WATCH_MODEL_PATH",
    "WATCH_MODEL_DRIVERS",
    "WATCH_PROB_THRESHOLD",
    "WATCH_METRICS_ADDR",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[serial]
#[test]
fn toml_and_json_paths_parse() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("watch.toml");
    fs::write(
        &p_toml,
        r#"
[feed]
subreddit = "stocks"

[extract]
flair = "Due Diligence"
cohort_size = 10
"#,
    )
    .unwrap();
    let cfg = WatchConfig::load_from(&p_toml).unwrap();
    assert_eq!(cfg.feed.subreddit, "stocks");
    assert_eq!(cfg.extract.flair, "Due Diligence");
    assert_eq!(cfg.extract.cohort_size, 10);
    assert_eq!(cfg.extract.batch_limit, 100);

    let p_json = dir.path().join("watch.json");
    fs::write(&p_json, r#"{ "schedule": { "interval_secs": 60, "end_time": "16:00" } }"#).unwrap();
    let cfg = WatchConfig::load_from(&p_json).unwrap();
    assert_eq!(cfg.schedule.interval_secs, 60);
    assert_eq!(cfg.schedule.end_time, "16:00");
    assert!(cfg.validate().is_ok());
}

#[serial]
#[test]
fn default_uses_env_then_fallbacks() {
    clear_env();
    // isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) nothing on disk → built-in defaults
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg, WatchConfig::default());

    // 2) fallback ./config/watch.toml
    fs::create_dir_all("config").unwrap();
    fs::write("config/watch.toml", "[extract]\nflair = \"Research\"\n").unwrap();
    assert_eq!(WatchConfig::load_default().unwrap().extract.flair, "Research");

    // 3) explicit path wins, env overrides win over the file
    let p = tmp.path().join("explicit.toml");
    fs::write(&p, "[schedule]\ninterval_secs = 120\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, &p);
    env::set_var("WATCH_FLAIR", "DD");
    env::set_var("WATCH_MODEL_DRIVERS", "proj_score_60, comment_sentiment");
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.schedule.interval_secs, 120);
    assert_eq!(cfg.extract.flair, "DD");
    assert_eq!(
        cfg.model.drivers,
        vec!["proj_score_60".to_string(), "comment_sentiment".to_string()]
    );

    // 4) dangling explicit path is an error, not a silent fallback
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
    assert!(WatchConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(old).unwrap();
}

#[serial]
#[test]
fn stray_overrides_are_cleared_before_default_load() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::set_var("WATCH_SUBREDDIT", "stocks");
    env::set_var("WATCH_ALERTS", "off");
    env::set_var("WATCH_METRICS_ADDR", "127.0.0.1:9184");
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.feed.subreddit, "stocks");
    assert!(!cfg.alerts.enabled);
    assert_eq!(cfg.metrics_addr.as_deref(), Some("127.0.0.1:9184"));

    clear_env();
    assert_eq!(WatchConfig::load_default().unwrap(), WatchConfig::default());

    env::set_current_dir(old).unwrap();
}

#[serial]
#[test]
fn bad_numeric_env_is_reported() {
    clear_env();
    let mut cfg = WatchConfig::default();
    env::set_var("WATCH_INTERVAL_SECS", "five minutes");
    let err = cfg.apply_env_overrides().unwrap_err();
    assert!(err.to_string().contains("WATCH_INTERVAL_SECS"));
    clear_env();
}

#[serial]
#[test]
fn model_settings_validate() {
    clear_env();
    let mut cfg = WatchConfig::default();
    cfg.model.enabled = true;
    cfg.model.probability_threshold = 1.5;
    assert_eq!(cfg.validate(), Err(ConfigError::Threshold("1.5".into())));

    cfg.model.probability_threshold = 0.5;
    cfg.model.drivers = vec!["front_page_flag".into()];
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::NonNumericDriver("front_page_flag".into()))
    );
}
