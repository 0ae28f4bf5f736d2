// src/monitor.rs
//! The monitor ties the pass pipeline to the run guard, the competitor catalog
//! and the URL policy. Both the scheduler and the HTTP API go through here, so
//! they share one single-flight guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;

use crate::dashboard::{Competitor, CompetitorPatch, Dashboard};
use crate::error::{CatalogError, TriggerError};
use crate::pipeline::{Membership, PassReport, Pipeline};
use crate::policy::UrlPolicy;
use crate::run_state::{RunGuard, Trigger};

impl Membership for Dashboard {
    fn contains(&self, name: &str) -> bool {
        Dashboard::contains(self, name)
    }
}

pub struct Monitor {
    pipeline: Pipeline,
    dashboard: Arc<Dashboard>,
    guard: RunGuard,
    policy: UrlPolicy,
    interval: Duration,
}

impl Monitor {
    pub fn new(pipeline: Pipeline, dashboard: Arc<Dashboard>, policy: UrlPolicy) -> Self {
        Self {
            pipeline,
            dashboard,
            guard: RunGuard::new(),
            policy,
            interval: Duration::from_secs(crate::config::settings::DEFAULT_INTERVAL_SECS),
        }
    }

    /// Interval used for the advertised `nextRun`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one pass unless one is already in flight.
    ///
    /// Per-source problems never fail the run; only failing to enumerate the
    /// sources does. Rejected triggers leave the run counters untouched.
    pub async fn trigger(&self, trigger: Trigger) -> Result<PassReport, TriggerError> {
        let ticket = self.guard.try_begin(trigger).inspect_err(|_| {
            tracing::info!(trigger = trigger.as_str(), "run rejected; already running");
        })?;
        tracing::info!(trigger = trigger.as_str(), "monitoring run started");

        let sources = match self.dashboard.active_sources() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "monitoring run failed");
                counter!("monitor_runs_total", "outcome" => "failed").increment(1);
                ticket.fail();
                return Err(e.into());
            }
        };
        let (sources, _blocked) = self.policy.filter(sources);
        if sources.is_empty() {
            tracing::warn!("no valid competitors to check");
        }

        let report = self.pipeline.run_pass_in(&sources, self.dashboard.as_ref()).await;
        {
            let _gate = self.pipeline.lock_writes().await;
            self.dashboard.record_changes(&report.changes, trigger);
        }

        ticket.succeed();
        self.guard.set_next_run(Utc::now() + self.interval);
        counter!("monitor_runs_total", "outcome" => "succeeded").increment(1);
        tracing::info!(
            trigger = trigger.as_str(),
            changed_sources = report.changes.len(),
            new_lines = report.changes.total_lines(),
            skipped = report.skipped.len(),
            "monitoring run finished"
        );
        Ok(report)
    }

    pub fn add_competitor(
        &self,
        name: &str,
        changelog: &str,
        description: Option<String>,
    ) -> Result<Competitor, CatalogError> {
        if !changelog.trim().is_empty() && self.policy.is_blocked(changelog) {
            return Err(CatalogError::Blocked);
        }
        let c = self.dashboard.add(name, changelog, description)?;
        tracing::info!(competitor = %c.name, "competitor added");
        Ok(c)
    }

    /// Apply a patch. A rename carries the snapshot over to the new name so the
    /// next run does not report the whole page as new.
    pub async fn update_competitor(
        &self,
        id: usize,
        patch: CompetitorPatch,
    ) -> Result<Competitor, CatalogError> {
        if let Some(url) = patch.changelog.as_deref() {
            if !url.trim().is_empty() && self.policy.is_blocked(url) {
                return Err(CatalogError::Blocked);
            }
        }
        let _gate = self.pipeline.lock_writes().await;
        let (comp, old_name) = self.dashboard.update(id, patch)?;
        if comp.name != old_name {
            let store = self.pipeline.store();
            let lines = store.load(&old_name).await;
            if let Err(e) = store.save(&comp.name, &lines).await {
                tracing::warn!(competitor = %comp.name, error = %e, "snapshot move failed");
            } else if let Err(e) = store.purge(&old_name).await {
                tracing::warn!(competitor = %old_name, error = %e, "old snapshot not removed");
            }
            tracing::info!(from = %old_name, to = %comp.name, "competitor renamed");
        }
        Ok(comp)
    }

    /// Remove a competitor, its change events and its snapshot.
    /// Returns the removed competitor and how many events were dropped.
    pub async fn delete_competitor(&self, id: usize) -> Result<(Competitor, usize), CatalogError> {
        let _gate = self.pipeline.lock_writes().await;
        let (comp, removed) = self.dashboard.remove(id)?;
        match self.pipeline.store().purge(&comp.name).await {
            Ok(existed) => {
                tracing::info!(competitor = %comp.name, removed, snapshot = existed, "competitor deleted")
            }
            Err(e) => tracing::warn!(competitor = %comp.name, error = %e, "snapshot purge failed"),
        }
        Ok((comp, removed))
    }
}
