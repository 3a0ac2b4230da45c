use anyhow::{anyhow, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Alert, Notifier};

const VARS: [&str; 5] = [
    "SMTP_HOST",
    "SMTP_USER",
    "SMTP_PASS",
    "NOTIFY_EMAIL_FROM",
    "NOTIFY_EMAIL_TO",
];

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(host: &str, user: String, pass: String, from: &str, to: &str) -> Result<Self> {
        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("invalid SMTP_HOST {host:?}"))?
            .credentials(creds)
            .build();
        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid NOTIFY_EMAIL_FROM {from:?}"))?;
        let to = to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid NOTIFY_EMAIL_TO {to:?}"))?;
        Ok(Self { mailer, from, to })
    }

    /// `Ok(None)` when email is not configured at all; an error when it is
    /// only half configured.
    pub fn from_env() -> Result<Option<Self>> {
        let vals: Vec<Option<String>> = VARS
            .iter()
            .map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
            .collect();
        if vals.iter().all(Option::is_none) {
            return Ok(None);
        }
        let missing: Vec<&str> = VARS
            .iter()
            .zip(&vals)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!("email partially configured, missing {missing:?}"));
        }
        // all five present past this point
        let v: Vec<String> = vals.into_iter().flatten().collect();
        Self::new(&v[0], v[1].clone(), v[2].clone(), &v[3], &v[4]).map(Some)
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject())
            .header(header::ContentType::TEXT_PLAIN)
            .body(alert.body())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
