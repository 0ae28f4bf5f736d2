// src/pipeline.rs
//! One monitoring pass: fetch -> diff -> snapshot replace -> aggregate, per
//! source, then summarize once and hand the summary to the sinks.

use std::sync::Arc;

use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::diff::{diff, split_lines};
use crate::fetch::Fetcher;
use crate::notify::{DeliveryOutcome, Notification, NotifierMux};
use crate::snapshot::SnapshotStore;
use crate::summarize::{Summarizer, Summary};
use crate::types::{ChangeSet, Source};

/// Result of a single pass. Per-source failures show up in `skipped`.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub changes: ChangeSet,
    /// `None` when nothing changed and empty notifications are disabled.
    pub summary: Option<Summary>,
    pub deliveries: Vec<DeliveryOutcome>,
    pub checked: usize,
    pub skipped: Vec<String>,
}

/// Answers whether a source is still tracked at the moment its snapshot is written.
pub trait Membership: Send + Sync {
    fn contains(&self, name: &str) -> bool;
}

pub struct Pipeline {
    store: Arc<dyn SnapshotStore>,
    fetcher: Arc<dyn Fetcher>,
    summarizer: Arc<Summarizer>,
    notifier: Arc<NotifierMux>,
    always_notify: bool,
    /// Serializes snapshot writes against catalog renames and deletes.
    write_gate: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        fetcher: Arc<dyn Fetcher>,
        summarizer: Arc<Summarizer>,
        notifier: Arc<NotifierMux>,
    ) -> Self {
        crate::metrics::ensure_described();
        Self {
            store,
            fetcher,
            summarizer,
            notifier,
            always_notify: false,
            write_gate: Mutex::new(()),
        }
    }

    /// Summarize and notify even when a pass finds nothing new.
    pub fn with_always_notify(mut self, on: bool) -> Self {
        self.always_notify = on;
        self
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn notifier(&self) -> &NotifierMux {
        &self.notifier
    }

    pub fn always_notify(&self) -> bool {
        self.always_notify
    }

    /// Hold this while renaming or deleting a source so no pass writes a
    /// snapshot for it in between.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Fetch and diff every source. Snapshots are replaced for every successful
    /// fetch; failed or blank fetches leave the snapshot untouched and add
    /// nothing. With `members`, a source dropped from the catalog while its page
    /// was in flight is skipped instead of having its snapshot recreated.
    pub async fn detect(
        &self,
        sources: &[Source],
        members: Option<&dyn Membership>,
    ) -> (ChangeSet, Vec<String>) {
        let mut changes = ChangeSet::new();
        let mut skipped = Vec::new();

        for src in sources {
            tracing::info!(source = %src.name, url = %src.changelog, "checking changelog");
            let raw = match self.fetcher.fetch(&src.changelog).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(source = %src.name, error = %e, "fetch failed; source skipped");
                    counter!("monitor_fetch_errors_total").increment(1);
                    skipped.push(src.name.clone());
                    continue;
                }
            };
            if raw.trim().is_empty() {
                tracing::warn!(source = %src.name, "blank changelog page; snapshot kept");
                counter!("monitor_fetch_errors_total").increment(1);
                skipped.push(src.name.clone());
                continue;
            }

            let _gate = self.write_gate.lock().await;
            if members.is_some_and(|m| !m.contains(&src.name)) {
                tracing::info!(source = %src.name, "source removed during pass; result dropped");
                continue;
            }

            let new_lines = split_lines(&raw);
            let old_lines = self.store.load(&src.name).await;
            let added = diff(&old_lines, &new_lines);

            if let Err(e) = self.store.save(&src.name, &new_lines).await {
                tracing::warn!(source = %src.name, error = %e, "snapshot save failed");
            }

            if added.is_empty() {
                tracing::info!(source = %src.name, "no new lines");
            } else {
                tracing::info!(source = %src.name, new_lines = added.len(), "new lines found");
                counter!("monitor_new_lines_total").increment(added.len() as u64);
                changes.insert(src.name.clone(), added);
            }
        }
        (changes, skipped)
    }

    /// Full pass: detect, then summarize exactly once and dispatch, unless the
    /// ChangeSet is empty and `always_notify` is off.
    pub async fn run_pass(&self, sources: &[Source]) -> PassReport {
        self.pass(sources, None).await
    }

    /// Like [`run_pass`](Self::run_pass), but drops sources that leave `members`
    /// before their snapshot is written.
    pub async fn run_pass_in(&self, sources: &[Source], members: &dyn Membership) -> PassReport {
        self.pass(sources, Some(members)).await
    }

    async fn pass(&self, sources: &[Source], members: Option<&dyn Membership>) -> PassReport {
        let (changes, skipped) = self.detect(sources, members).await;

        let (summary, deliveries) = if changes.is_empty() && !self.always_notify {
            tracing::info!("no changes detected; notification suppressed");
            (None, Vec::new())
        } else {
            let summary = self.summarizer.summarize(&changes).await;
            tracing::info!(kind = summary.kind.label(), "summary ready");
            if self.notifier.is_empty() {
                tracing::info!(summary = %summary.text, "no sinks configured; summary logged only");
            }
            let deliveries = self.notifier.notify(&Notification::new(&summary.text)).await;
            (Some(summary), deliveries)
        };

        gauge!("monitor_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        PassReport {
            checked: sources.len(),
            changes,
            summary,
            deliveries,
            skipped,
        }
    }
}
