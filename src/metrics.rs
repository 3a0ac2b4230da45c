use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_cycles_total", "Scrape cycles run, by kind.");
        describe_counter!(
            "watch_records_ingested_total",
            "Records appended to the ledger."
        );
        describe_counter!(
            "watch_items_skipped_total",
            "Listing items not ingested, by reason."
        );
        describe_counter!(
            "watch_predicted_total",
            "Records scored above the probability threshold."
        );
        describe_counter!(
            "watch_front_page_total",
            "Records newly seen on the front page."
        );
        describe_counter!(
            "watch_feed_errors_total",
            "Feed collaborator failures, by call."
        );
        describe_counter!("watch_alerts_sent_total", "Alerts delivered, by channel.");
        describe_counter!("watch_feed_items_total", "Items returned by feed listings.");
        describe_gauge!("watch_ledger_records", "Records held in the ledger.");
        describe_histogram!("watch_cycle_ms", "Wall time of one scrape cycle in milliseconds.");
        describe_histogram!("watch_feed_request_ms", "Feed HTTP request time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }

    /// Serve `/metrics` on `addr` until the task is dropped.
    pub async fn serve(&self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics listener on {addr}"))?;
        tracing::info!(addr, "metrics endpoint listening");
        axum::serve(listener, self.router())
            .await
            .context("metrics server")
    }
}
