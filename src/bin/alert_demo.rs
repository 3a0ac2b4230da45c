//! Demo that pushes sample alerts through the configured channels (log only when none are set).

use chrono::Utc;
use frontpage_watch::{Alert, AlertEntry, Notifier, NotifierMux};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let mux = NotifierMux::from_env()?;
    tracing::info!(channels = ?mux.channel_names(), "alert demo");

    let predicted = Alert::predicted(
        vec![AlertEntry {
            title: "Demo DD: why this ticker is undervalued".into(),
            url: "https://www.reddit.com/r/wallstreetbets/comments/demo1/".into(),
            probability: Some(0.81),
        }],
        Utc::now(),
    )
    .in_community("wallstreetbets");
    mux.send(&predicted).await?;

    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    let front_page = Alert::front_page(
        vec![AlertEntry {
            title: "Demo DD: why this ticker is undervalued".into(),
            url: "https://www.reddit.com/r/wallstreetbets/comments/demo1/".into(),
            probability: None,
        }],
        Utc::now(),
    )
    .in_community("wallstreetbets");
    mux.send(&front_page).await?;

    println!("alert-demo done");
    Ok(())
}
