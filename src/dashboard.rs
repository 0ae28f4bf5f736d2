//! In-memory competitor catalog and recent change events.
//!
//! The catalog is the live source list for runs; the event log is a bounded
//! mirror (newest `cap` entries) for the dashboard. Nothing here is persisted.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, RunError};
use crate::run_state::{iso, Trigger};
use crate::summarize::truncate_chars;
use crate::types::{ChangeSet, Source};

pub const DEFAULT_EVENT_CAP: usize = 100;
const EVENT_SUMMARY_CHARS: usize = 100;
/// Upper bound for `changes(days)`; anything larger already covers the whole log.
const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitorStatus {
    Active,
    Paused,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub id: usize, // 1-based, re-sequenced after deletes
    pub name: String,
    pub changelog: String,
    pub description: String,
    pub status: CompetitorStatus,
    pub last_update: String,
    pub changes_detected: u64,
}

impl Competitor {
    pub fn to_source(&self) -> Source {
        Source {
            name: self.name.clone(),
            changelog: self.changelog.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub id: u64,
    pub competitor: String,
    pub timestamp: String,
    #[serde(skip)]
    pub at: DateTime<Utc>,
    pub summary: String,
    pub changes: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Trigger,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitorPatch {
    pub name: Option<String>,
    pub changelog: Option<String>,
    pub description: Option<String>,
    pub status: Option<CompetitorStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub date: String,
    pub changes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitorCount {
    pub competitor: String,
    pub changes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub weekly_activity: Vec<DayCount>,
    pub competitor_activity: Vec<CompetitorCount>,
    pub change_types: Vec<TypeCount>,
}

#[derive(Debug)]
struct State {
    competitors: Vec<Competitor>,
    events: VecDeque<ChangeEvent>,
    next_event_id: u64,
}

#[derive(Debug)]
pub struct Dashboard {
    inner: RwLock<State>,
    cap: usize,
}

impl Dashboard {
    pub fn new(sources: Vec<Source>) -> Self {
        Self::with_capacity(sources, DEFAULT_EVENT_CAP)
    }

    pub fn with_capacity(sources: Vec<Source>, cap: usize) -> Self {
        let now = iso(Utc::now());
        let competitors = sources
            .into_iter()
            .enumerate()
            .map(|(i, s)| Competitor {
                id: i + 1,
                name: s.name,
                changelog: s.changelog,
                description: s.description.unwrap_or_default(),
                status: CompetitorStatus::Active,
                last_update: now.clone(),
                changes_detected: 0,
            })
            .collect();
        Self {
            inner: RwLock::new(State {
                competitors,
                events: VecDeque::with_capacity(cap),
                next_event_id: 1,
            }),
            cap: cap.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Active competitors as run sources, in catalog order.
    pub fn active_sources(&self) -> Result<Vec<Source>, RunError> {
        let st = self
            .inner
            .read()
            .map_err(|_| RunError::Sources("competitor catalog lock poisoned".into()))?;
        Ok(st
            .competitors
            .iter()
            .filter(|c| c.status == CompetitorStatus::Active)
            .map(Competitor::to_source)
            .collect())
    }

    pub fn competitors(&self) -> Vec<Competitor> {
        self.read().competitors.clone()
    }

    pub fn competitor(&self, id: usize) -> Option<Competitor> {
        self.read().competitors.iter().find(|c| c.id == id).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().competitors.iter().any(|c| c.name == name)
    }

    pub fn add(
        &self,
        name: &str,
        changelog: &str,
        description: Option<String>,
    ) -> Result<Competitor, CatalogError> {
        let (name, changelog) = (name.trim(), changelog.trim());
        if name.is_empty() || changelog.is_empty() {
            return Err(CatalogError::Missing);
        }
        let mut st = self.write();
        if st.competitors.iter().any(|c| c.name == name) {
            return Err(CatalogError::Duplicate(name.to_string()));
        }
        let comp = Competitor {
            id: st.competitors.len() + 1,
            name: name.to_string(),
            changelog: changelog.to_string(),
            description: description.unwrap_or_default(),
            status: CompetitorStatus::Active,
            last_update: iso(Utc::now()),
            changes_detected: 0,
        };
        st.competitors.push(comp.clone());
        Ok(comp)
    }

    /// Apply `patch`. Returns the updated competitor and its previous name.
    /// A rename also re-keys that competitor's change events.
    pub fn update(
        &self,
        id: usize,
        patch: CompetitorPatch,
    ) -> Result<(Competitor, String), CatalogError> {
        let mut st = self.write();
        let idx = st
            .competitors
            .iter()
            .position(|c| c.id == id)
            .ok_or(CatalogError::NotFound)?;
        let old_name = st.competitors[idx].name.clone();

        let new_name = patch
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&old_name)
            .to_string();
        let new_url = patch
            .changelog
            .as_deref()
            .map(str::trim)
            .unwrap_or(&st.competitors[idx].changelog)
            .to_string();
        if new_name.is_empty() || new_url.is_empty() {
            return Err(CatalogError::Missing);
        }
        if new_name != old_name && st.competitors.iter().any(|c| c.name == new_name) {
            return Err(CatalogError::Duplicate(new_name));
        }

        if new_name != old_name {
            for ev in st.events.iter_mut().filter(|e| e.competitor == old_name) {
                ev.competitor = new_name.clone();
            }
        }
        let comp = &mut st.competitors[idx];
        comp.name = new_name;
        comp.changelog = new_url;
        if let Some(d) = patch.description {
            comp.description = d;
        }
        if let Some(s) = patch.status {
            comp.status = s;
        }
        comp.last_update = iso(Utc::now());
        Ok((comp.clone(), old_name))
    }

    /// Remove a competitor and its events. Returns it plus the number of events dropped.
    pub fn remove(&self, id: usize) -> Result<(Competitor, usize), CatalogError> {
        let mut st = self.write();
        let idx = st
            .competitors
            .iter()
            .position(|c| c.id == id)
            .ok_or(CatalogError::NotFound)?;
        let comp = st.competitors.remove(idx);
        for (i, c) in st.competitors.iter_mut().enumerate() {
            c.id = i + 1;
        }
        let before = st.events.len();
        st.events.retain(|e| e.competitor != comp.name);
        let removed = before - st.events.len();
        Ok((comp, removed))
    }

    /// One event per new line; the log is trimmed from the front to `cap`.
    /// Lines for names no longer in the catalog are dropped.
    pub fn record_changes(&self, changes: &ChangeSet, trigger: Trigger) {
        let now = Utc::now();
        let ts = iso(now);
        let mut st = self.write();
        for (name, lines) in changes.iter() {
            if !st.competitors.iter().any(|c| c.name == name) {
                tracing::debug!(competitor = %name, "changes for unknown competitor dropped");
                continue;
            }
            for line in lines {
                let id = st.next_event_id;
                st.next_event_id += 1;
                st.events.push_back(ChangeEvent {
                    id,
                    competitor: name.to_string(),
                    timestamp: ts.clone(),
                    at: now,
                    summary: event_summary(line),
                    changes: vec![line.clone()],
                    kind: trigger,
                });
            }
            if let Some(c) = st.competitors.iter_mut().find(|c| c.name == name) {
                c.changes_detected += lines.len() as u64;
                c.last_update = ts.clone();
            }
        }
        let excess = st.events.len().saturating_sub(self.cap);
        st.events.drain(..excess);
    }

    /// Events newer than `days`, optionally for one competitor, oldest first.
    pub fn changes(&self, competitor: Option<&str>, days: i64) -> Vec<ChangeEvent> {
        let cutoff = Utc::now() - Duration::days(days.clamp(0, MAX_WINDOW_DAYS));
        self.read()
            .events
            .iter()
            .filter(|e| competitor.map_or(true, |c| e.competitor == c))
            .filter(|e| e.at > cutoff)
            .cloned()
            .collect()
    }

    pub fn recent(&self, n: usize) -> Vec<ChangeEvent> {
        let st = self.read();
        let start = st.events.len().saturating_sub(n);
        st.events.iter().skip(start).cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        self.read().events.len()
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let st = self.read();
        let active = st
            .competitors
            .iter()
            .filter(|c| c.status == CompetitorStatus::Active)
            .count();
        let day_ago = Utc::now() - Duration::hours(24);
        let last_24h = st.events.iter().filter(|e| e.at > day_ago).count();
        (st.competitors.len(), active, last_24h)
    }

    pub fn analytics(&self) -> Analytics {
        let st = self.read();
        let today = Utc::now().date_naive();

        let weekly_activity = (0..7)
            .rev()
            .map(|back| {
                let day = today - Duration::days(back);
                DayCount {
                    date: day.to_string(),
                    changes: st.events.iter().filter(|e| e.at.date_naive() == day).count(),
                }
            })
            .collect();

        let mut per: BTreeMap<&str, usize> = BTreeMap::new();
        for e in &st.events {
            *per.entry(e.competitor.as_str()).or_default() += 1;
        }
        let competitor_activity = per
            .into_iter()
            .map(|(competitor, changes)| CompetitorCount {
                competitor: competitor.to_string(),
                changes,
            })
            .collect();

        let mut change_types: Vec<TypeCount> = ["feature", "update", "fix"]
            .into_iter()
            .map(|kind| TypeCount {
                kind,
                count: st
                    .events
                    .iter()
                    .filter(|e| e.summary.to_lowercase().contains(kind))
                    .count(),
                percentage: 0.0,
            })
            .collect();
        let total = change_types.iter().map(|t| t.count).sum::<usize>().max(1);
        for t in &mut change_types {
            t.percentage = (1000.0 * t.count as f64 / total as f64).round() / 10.0;
        }

        Analytics {
            weekly_activity,
            competitor_activity,
            change_types,
        }
    }
}

fn event_summary(line: &str) -> String {
    if line.chars().count() > EVENT_SUMMARY_CHARS {
        format!("{}...", truncate_chars(line, EVENT_SUMMARY_CHARS))
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dash() -> Dashboard {
        Dashboard::new(vec![
            Source::new("GitHub", "https://github.blog/changelog/"),
            Source::new("Vercel", "https://vercel.com/changelog"),
        ])
    }

    #[test]
    fn add_rejects_duplicates_and_blanks() {
        let d = dash();
        assert_eq!(
            d.add("GitHub", "https://x.example", None).unwrap_err(),
            CatalogError::Duplicate("GitHub".into())
        );
        assert_eq!(d.add("  ", "https://x.example", None).unwrap_err(), CatalogError::Missing);
        let c = d.add("Netlify", "https://netlify.example/log", None).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn remove_resequences_ids_and_drops_events() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("GitHub", vec!["a".into(), "b".into()]);
        cs.insert("Vercel", vec!["c".into()]);
        d.record_changes(&cs, Trigger::Manual);

        let (gone, removed) = d.remove(1).unwrap();
        assert_eq!(gone.name, "GitHub");
        assert_eq!(removed, 2);
        let left = d.competitors();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, 1);
        assert_eq!(left[0].name, "Vercel");
        assert_eq!(d.event_count(), 1);
        assert_eq!(d.remove(9).unwrap_err(), CatalogError::NotFound);
    }

    #[test]
    fn event_log_is_bounded_from_the_front() {
        let d = Dashboard::with_capacity(vec![Source::new("A", "https://a.example")], 100);
        let lines: Vec<String> = (0..130).map(|i| format!("line {i}")).collect();
        let mut cs = ChangeSet::new();
        cs.insert("A", lines);
        d.record_changes(&cs, Trigger::Scheduled);

        let all = d.recent(1000);
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].changes[0], "line 30");
        assert_eq!(all[99].changes[0], "line 129");
        assert_eq!(d.competitors()[0].changes_detected, 130);
    }

    #[test]
    fn event_summary_is_truncated_to_100_chars() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("GitHub", vec!["z".repeat(150)]);
        d.record_changes(&cs, Trigger::Manual);
        let ev = &d.recent(1)[0];
        assert_eq!(ev.summary, format!("{}...", "z".repeat(100)));
        assert_eq!(ev.changes[0].len(), 150);
    }

    #[test]
    fn paused_competitors_are_not_run() {
        let d = dash();
        let patch = CompetitorPatch {
            status: Some(CompetitorStatus::Paused),
            ..Default::default()
        };
        d.update(2, patch).unwrap();
        let names: Vec<_> = d.active_sources().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["GitHub"]);
    }

    #[test]
    fn rename_rekeys_events_and_rejects_collisions() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("GitHub", vec!["a".into()]);
        d.record_changes(&cs, Trigger::Manual);

        let clash = CompetitorPatch {
            name: Some("Vercel".into()),
            ..Default::default()
        };
        assert!(matches!(d.update(1, clash), Err(CatalogError::Duplicate(_))));

        let rename = CompetitorPatch {
            name: Some("GitHub Blog".into()),
            ..Default::default()
        };
        let (c, old) = d.update(1, rename).unwrap();
        assert_eq!(old, "GitHub");
        assert_eq!(c.name, "GitHub Blog");
        assert_eq!(d.changes(Some("GitHub Blog"), 7).len(), 1);
    }

    #[test]
    fn changes_for_removed_competitors_are_not_recorded() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("Gone Inc", vec!["ghost".into()]);
        cs.insert("Vercel", vec!["real".into()]);
        d.record_changes(&cs, Trigger::Manual);
        assert_eq!(d.event_count(), 1);
        assert_eq!(d.recent(1)[0].competitor, "Vercel");
        assert!(d.contains("Vercel"));
        assert!(!d.contains("Gone Inc"));
    }

    #[test]
    fn huge_or_negative_windows_do_not_overflow() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("GitHub", vec!["a".into()]);
        d.record_changes(&cs, Trigger::Manual);
        assert_eq!(d.changes(None, i64::MAX).len(), 1);
        assert_eq!(d.changes(None, 100_000_000).len(), 1);
        assert!(d.changes(None, i64::MIN).is_empty());
    }

    #[test]
    fn analytics_counts_today_and_types() {
        let d = dash();
        let mut cs = ChangeSet::new();
        cs.insert("GitHub", vec!["New feature: X".into(), "Bug fix for Y".into()]);
        d.record_changes(&cs, Trigger::Manual);
        let a = d.analytics();
        assert_eq!(a.weekly_activity.len(), 7);
        assert_eq!(a.weekly_activity[6].changes, 2);
        assert_eq!(a.competitor_activity[0].changes, 2);
        let feature = a.change_types.iter().find(|t| t.kind == "feature").unwrap();
        assert_eq!(feature.count, 1);
        assert_eq!(feature.percentage, 50.0);
    }
}
