use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_runs_total", "Monitoring runs by outcome.");
        describe_counter!(
            "monitor_fetch_errors_total",
            "Changelog fetches that failed or returned no content."
        );
        describe_counter!(
            "monitor_new_lines_total",
            "New changelog lines detected across sources."
        );
        describe_counter!("monitor_summaries_total", "Summaries produced by kind.");
        describe_counter!(
            "monitor_delivery_failures_total",
            "Notification deliveries that failed, by sink."
        );
        describe_gauge!("monitor_last_run_ts", "Unix ts when a pass last finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if another recorder is installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_described();
        Ok(Self { handle })
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
}
