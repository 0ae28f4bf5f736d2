// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::TriggerError;
use crate::monitor::Monitor;
use crate::run_state::Trigger;

/// Spawn the periodic trigger. The first run fires one `interval` after start;
/// ticks that land while a run is in flight are rejected by the run guard, and
/// a failed run is logged and never ends the loop.
pub fn spawn_scheduler(monitor: Arc<Monitor>, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_secs(1));
    monitor.guard().set_next_run(Utc::now() + period);

    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = period.as_secs(), "scheduler started");

        loop {
            ticker.tick().await;
            match monitor.trigger(Trigger::Scheduled).await {
                Ok(report) => tracing::info!(
                    changed_sources = report.changes.len(),
                    "scheduled run complete"
                ),
                Err(TriggerError::AlreadyRunning) => {
                    tracing::info!("skipping scheduled run; already running")
                }
                Err(e) => tracing::error!(error = %e, "scheduled run failed"),
            }
            monitor.guard().set_next_run(Utc::now() + period);
        }
    })
}
