// src/schedule.rs
use chrono::{DateTime, Local, TimeZone, Utc};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::config::watch::ScheduleCfg;
use crate::error::{ConfigError, CycleError};
use crate::orchestrator::Orchestrator;

/// When to tick, when to stop, and when to take the last look at the front page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    pub interval: Duration,
    pub cutoff: DateTime<Utc>,
    pub final_check_at: DateTime<Utc>,
}

impl SchedulePlan {
    pub fn for_today(cfg: &ScheduleCfg) -> Result<Self, ConfigError> {
        Self::for_day(cfg, &Local::now())
    }

    /// `end_time` is read as wall-clock time in `now`'s zone, on `now`'s date.
    pub fn for_day<Tz: TimeZone>(cfg: &ScheduleCfg, now: &DateTime<Tz>) -> Result<Self, ConfigError> {
        let end = cfg.end_time()?;
        let cutoff = now
            .timezone()
            .from_local_datetime(&now.date_naive().and_time(end))
            .earliest()
            .ok_or_else(|| ConfigError::Setting {
                key: "schedule.end_time",
                reason: format!("{} does not exist on {}", cfg.end_time, now.date_naive()),
            })?
            .with_timezone(&Utc);
        if now.with_timezone(&Utc) >= cutoff {
            return Err(ConfigError::Setting {
                key: "schedule.end_time",
                reason: format!("{} has already passed today", cfg.end_time),
            });
        }
        Ok(Self {
            interval: Duration::from_secs(cfg.interval_secs.max(1)),
            cutoff,
            final_check_at: cutoff + chrono::Duration::minutes(cfg.final_check_delay_mins as i64),
        })
    }
}

/// Drive cycles until the cutoff, then the final check. Returns early on
/// Ctrl-C or on a fatal cycle error; other cycle errors wait for the next tick.
pub async fn run(orch: &mut Orchestrator, plan: &SchedulePlan) -> Result<(), CycleError> {
    tracing::info!(
        interval_secs = plan.interval.as_secs(),
        cutoff = %plan.cutoff,
        final_check_at = %plan.final_check_at,
        "scheduler started"
    );
    let mut ticker = tokio::time::interval(plan.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping before the final check");
                return Ok(());
            }
        }
        if Utc::now() >= plan.cutoff {
            break;
        }
        match orch.run_cycle().await {
            Ok(report) => tracing::debug!(?report, "cycle done"),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "fatal cycle error; stopping scheduler");
                return Err(e);
            }
            Err(e) => tracing::warn!(error = %e, "cycle failed; retrying next tick"),
        }
    }

    let wait = (plan.final_check_at - Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    tracing::info!(wait_secs = wait.as_secs(), "cutoff reached; waiting for final check");
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted; final check skipped");
            return Ok(());
        }
    }

    match orch.run_final_check().await {
        Ok(report) => {
            tracing::info!(newly_flagged = report.newly_flagged.len(), "schedule finished");
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "final check failed");
            Ok(())
        }
    }
}
