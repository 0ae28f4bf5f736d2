// src/run_state.rs
//! Single-flight run guard shared by scheduled and manual triggers.
//!
//! The only way into `Running` is [`RunGuard::try_begin`], a compare-and-set
//! under the mutex. The returned [`RunTicket`] is the only way out: `succeed`,
//! `fail`, or dropping it (counted as a failure) returns the guard to `Idle`.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::TriggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Manual,
    Scheduled,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled => "scheduled",
        }
    }
}

/// Dashboard-facing run status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub is_running: bool,
    pub phase: RunPhase,
    pub last_outcome: Option<RunOutcome>,
    pub last_trigger: Option<Trigger>,
    pub last_run: Option<String>,
    pub next_run: Option<String>,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            phase: RunPhase::Idle,
            last_outcome: None,
            last_trigger: None,
            last_run: None,
            next_run: None,
            total_runs: 0,
            successful_runs: 0,
            failed_runs: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct RunGuard {
    inner: Arc<Mutex<RunStatus>>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RunStatus> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Idle -> Running, or `AlreadyRunning` without touching any counter.
    pub fn try_begin(&self, trigger: Trigger) -> Result<RunTicket, TriggerError> {
        let mut st = self.lock();
        if st.phase == RunPhase::Running {
            return Err(TriggerError::AlreadyRunning);
        }
        st.phase = RunPhase::Running;
        st.is_running = true;
        st.total_runs += 1;
        st.last_trigger = Some(trigger);
        Ok(RunTicket {
            guard: self.clone(),
            done: false,
        })
    }

    pub fn is_running(&self) -> bool {
        self.lock().phase == RunPhase::Running
    }

    pub fn status(&self) -> RunStatus {
        self.lock().clone()
    }

    pub fn set_next_run(&self, at: DateTime<Utc>) {
        self.lock().next_run = Some(iso(at));
    }

    fn finish(&self, outcome: RunOutcome) {
        let mut st = self.lock();
        st.phase = RunPhase::Idle;
        st.is_running = false;
        st.last_outcome = Some(outcome);
        st.last_run = Some(iso(Utc::now()));
        match outcome {
            RunOutcome::Succeeded => st.successful_runs += 1,
            RunOutcome::Failed => st.failed_runs += 1,
        }
    }
}

/// Proof that the holder owns the current run.
pub struct RunTicket {
    guard: RunGuard,
    done: bool,
}

impl RunTicket {
    pub fn succeed(mut self) {
        self.done = true;
        self.guard.finish(RunOutcome::Succeeded);
    }

    pub fn fail(mut self) {
        self.done = true;
        self.guard.finish(RunOutcome::Failed);
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if !self.done {
            self.guard.finish(RunOutcome::Failed);
        }
    }
}

pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_while_running() {
        let g = RunGuard::new();
        let t = g.try_begin(Trigger::Scheduled).unwrap();
        assert!(g.is_running());
        assert!(matches!(
            g.try_begin(Trigger::Manual),
            Err(TriggerError::AlreadyRunning)
        ));
        assert_eq!(g.status().total_runs, 1);

        t.succeed();
        let st = g.status();
        assert!(!st.is_running);
        assert_eq!(st.successful_runs, 1);
        assert_eq!(st.last_outcome, Some(RunOutcome::Succeeded));
        assert!(st.last_run.as_deref().is_some_and(|s| s.ends_with('Z')));

        assert!(g.try_begin(Trigger::Manual).is_ok());
    }

    #[test]
    fn dropped_ticket_counts_as_failure_and_releases() {
        let g = RunGuard::new();
        {
            let _t = g.try_begin(Trigger::Manual).unwrap();
        }
        let st = g.status();
        assert_eq!(st.phase, RunPhase::Idle);
        assert_eq!(st.failed_runs, 1);
        assert_eq!(st.last_outcome, Some(RunOutcome::Failed));
    }

    #[test]
    fn concurrent_begins_admit_exactly_one() {
        let g = RunGuard::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let g = g.clone();
                std::thread::spawn(move || g.try_begin(Trigger::Manual).ok().map(std::mem::forget))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(admitted, 1);
        assert!(g.is_running());
    }
}
