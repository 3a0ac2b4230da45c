//! frontpage-watch: binary entrypoint.
//! Loads config, wires the feed, model and notifiers, then runs today's schedule.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frontpage_watch::config::WatchConfig;
use frontpage_watch::feed::reddit::RedditClient;
use frontpage_watch::metrics::Metrics;
use frontpage_watch::schedule::{self, SchedulePlan};
use frontpage_watch::sentiment::LexiconScorer;
use frontpage_watch::{ClassifierAdapter, NotifierMux, Orchestrator};

/// Compact logs by default; `LOG_FORMAT=json` for log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("frontpage_watch=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load_default().context("loading watch config")?;
    cfg.validate().context("invalid watch config")?;
    tracing::info!(
        subreddit = %cfg.feed.subreddit,
        flair = %cfg.extract.flair,
        model = cfg.model.enabled,
        alerts = cfg.alerts.enabled,
        "config loaded"
    );

    if let Some(addr) = cfg.metrics_addr.clone() {
        let metrics = Metrics::init()?;
        tokio::spawn(async move {
            if let Err(e) = metrics.serve(&addr).await {
                tracing::warn!(error = ?e, "metrics endpoint stopped");
            }
        });
    }

    let plan = SchedulePlan::for_today(&cfg.schedule).context("building today's schedule")?;
    let feed = Arc::new(RedditClient::new(&cfg.feed)?);
    let classifier = ClassifierAdapter::from_config(&cfg.model)?;
    let notifier = Arc::new(NotifierMux::from_env()?);

    let mut orch = Orchestrator::from_config(
        &cfg,
        feed,
        notifier,
        classifier,
        Arc::new(LexiconScorer::new()),
    );
    schedule::run(&mut orch, &plan).await?;

    tracing::info!(
        records = orch.session().ledger().len(),
        flagged = orch.session().ledger().flagged_ids().len(),
        "done"
    );
    Ok(())
}
