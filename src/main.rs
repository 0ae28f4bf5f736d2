//! Changelog monitor server entrypoint.
//! Boots the Axum HTTP service (dashboard API + static frontend) and the
//! hourly scheduler, both sharing one monitor and its single-flight guard.

use std::sync::Arc;

use changelog_monitor::api::{self, AppState};
use changelog_monitor::config::MonitorSettings;
use changelog_monitor::metrics::Metrics;
use changelog_monitor::scheduler::spawn_scheduler;
use changelog_monitor::{build_monitor, telemetry};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    // Recorder first, so metric descriptions land in the exporter.
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed; /metrics disabled");
            None
        }
    };

    let settings = MonitorSettings::from_env();
    let monitor = Arc::new(build_monitor(&settings)?);

    if settings.scheduler_enabled {
        spawn_scheduler(monitor.clone(), settings.interval);
    } else {
        tracing::info!("scheduler disabled (SCHEDULER_ENABLED=0)");
    }

    let mut router = api::create_router(AppState::new(monitor), &settings.static_dir);
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
