// src/lib.rs
// Public library surface for the server, the CLI and integration tests.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod pipeline;
pub mod policy;
pub mod run_state;
pub mod scheduler;
pub mod snapshot;
pub mod summarize;
pub mod telemetry;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::monitor::Monitor;
pub use crate::pipeline::{Membership, PassReport, Pipeline};
pub use crate::types::{ChangeSet, Source};

use std::sync::Arc;

use anyhow::Context;

use crate::config::MonitorSettings;
use crate::dashboard::Dashboard;
use crate::fetch::HttpFetcher;
use crate::notify::NotifierMux;
use crate::policy::UrlPolicy;
use crate::snapshot::FileSnapshotStore;
use crate::summarize::Summarizer;

/// Wire a production monitor from config files and the environment:
/// sources file, snapshot dir, HTTP fetcher, summarizer and notification sinks.
pub fn build_monitor(settings: &MonitorSettings) -> anyhow::Result<Monitor> {
    let sources = config::load_sources_default().context("loading sources")?;
    let policy = UrlPolicy::from_env();
    let (sources, _blocked) = policy.filter(sources);
    tracing::info!(
        sources = sources.len(),
        snapshot_dir = %settings.snapshot_dir.display(),
        "monitor configured"
    );

    let fetcher = HttpFetcher::new(settings.fetch_timeout_secs, settings.tls_insecure_retry)
        .context("building HTTP fetcher")?;
    let pipeline = Pipeline::new(
        Arc::new(FileSnapshotStore::new(&settings.snapshot_dir)),
        Arc::new(fetcher),
        Arc::new(Summarizer::from_env()),
        Arc::new(NotifierMux::from_env()),
    )
    .with_always_notify(settings.always_notify);

    Ok(Monitor::new(pipeline, Arc::new(Dashboard::new(sources)), policy)
        .with_interval(settings.interval))
}
