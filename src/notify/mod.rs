pub mod email;
pub mod slack;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use email::EmailNotifier;
pub use slack::SlackNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Model thinks these posts will make the front page.
    Predicted,
    /// These posts have just been seen on the front page.
    FrontPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    pub title: String,
    pub url: String,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub entries: Vec<AlertEntry>,
    pub ts: DateTime<Utc>,
    /// Subreddit name without the `r/` prefix.
    pub community: Option<String>,
}

impl Alert {
    pub fn predicted(entries: Vec<AlertEntry>, ts: DateTime<Utc>) -> Self {
        Self {
            kind: AlertKind::Predicted,
            entries,
            ts,
            community: None,
        }
    }

    pub fn front_page(entries: Vec<AlertEntry>, ts: DateTime<Utc>) -> Self {
        Self {
            kind: AlertKind::FrontPage,
            entries,
            ts,
            community: None,
        }
    }

    pub fn in_community(mut self, name: impl Into<String>) -> Self {
        self.community = Some(name.into());
        self
    }

    pub fn subject(&self) -> &'static str {
        "DD alert"
    }

    pub fn header(&self) -> String {
        let lead = match self.kind {
            AlertKind::Predicted => "The following posts are predicted to reach the front page",
            AlertKind::FrontPage => "The following posts have reached the front page",
        };
        match self.community.as_deref() {
            Some(c) => format!("{lead} of r/{c}:"),
            None => format!("{lead}:"),
        }
    }

    /// Plain-text body, ASCII only (anything else becomes a space).
    pub fn body(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        for e in &self.entries {
            out.push('\n');
            out.push_str(&e.title);
            out.push('\n');
            out.push_str(&e.url);
            out.push('\n');
            if let Some(p) = e.probability {
                out.push_str(&format!("probability = {p:.2}\n"));
            }
        }
        to_ascii(&out)
    }
}

fn to_ascii(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii() { c } else { ' ' }).collect()
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log only. Used when no channel is configured.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        tracing::info!(
            kind = ?alert.kind,
            posts = alert.entries.len(),
            "alert (log only):\n{}",
            alert.body()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Fans one alert out to every configured channel. Per-channel failures are
/// logged and do not stop the others.
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Email if SMTP_* / NOTIFY_EMAIL_* are set, Slack if SLACK_WEBHOOK_URL is
    /// set, otherwise log only.
    pub fn from_env() -> Result<Self> {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(email) = EmailNotifier::from_env()? {
            tracing::info!("email notifications enabled");
            channels.push(Arc::new(email));
        }
        if let Some(slack) = SlackNotifier::from_env() {
            tracing::info!("slack notifications enabled");
            channels.push(Arc::new(slack));
        }
        if channels.is_empty() {
            tracing::info!("no notification channel configured, alerts go to the log");
            channels.push(Arc::new(LogNotifier));
        }
        Ok(Self::new(channels))
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let mut failed = 0usize;
        for ch in &self.channels {
            match ch.send(alert).await {
                Ok(()) => {
                    metrics::counter!("watch_alerts_sent_total", "channel" => ch.name())
                        .increment(1);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(error = ?e, channel = ch.name(), "alert send failed");
                }
            }
        }
        if failed > 0 && failed == self.channels.len() {
            anyhow::bail!("all {failed} notification channels failed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
