// src/snapshot.rs
//! Snapshot store: last observed line sequence per source.
//!
//! Layout on disk is one JSON array per source under a single directory:
//!
//! ```text
//! {snapshot_dir}/
//! ├── GitHub.json
//! └── Acme.json
//! ```
//!
//! Loads never fail the caller. A missing file is an empty snapshot; an
//! unreadable or malformed one is logged and also treated as empty, so the
//! pipeline keeps going at the cost of re-reporting that source's lines once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;

use crate::error::SnapshotError;

pub const DEFAULT_SNAPSHOT_DIR: &str = "data";

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persisted lines for `name`, or empty when none exist or they can't be read.
    async fn load(&self, name: &str) -> Vec<String>;

    /// Replace the snapshot for `name` with `lines` (order preserved).
    async fn save(&self, name: &str, lines: &[String]) -> Result<(), SnapshotError>;

    /// Remove the snapshot for `name`. Returns whether one existed.
    async fn purge(&self, name: &str) -> Result<bool, SnapshotError>;
}

/// JSON-file snapshot store. Access to a single file is serialized; different
/// names map to different files and never contend.
pub struct FileSnapshotStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// File path used for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    /// Locks are keyed by file stem, the same key the filesystem sees.
    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(file_stem(name)).or_default().clone()
    }

    /// Drop the lock entry for `name` unless someone else is holding or waiting on it.
    fn release_lock(&self, name: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(&file_stem(name));
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<String>>, SnapshotError> {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::io(name, e)),
        };
        let lines: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| SnapshotError::corrupt(name, e))?;
        Ok(Some(lines))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, name: &str) -> Vec<String> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;
        match self.read(name).await {
            Ok(Some(lines)) => lines,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "snapshot unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    async fn save(&self, name: &str, lines: &[String]) -> Result<(), SnapshotError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SnapshotError::io(name, e))?;

        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(lines).map_err(|e| SnapshotError::corrupt(name, e))?;
        fs::write(&tmp, json)
            .await
            .map_err(|e| SnapshotError::io(name, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SnapshotError::io(name, e))?;
        tracing::debug!(source = %name, lines = lines.len(), "snapshot saved");
        Ok(())
    }

    async fn purge(&self, name: &str) -> Result<bool, SnapshotError> {
        let lock = self.lock_for(name);
        let guard = lock.lock().await;
        let res = match fs::remove_file(self.path_for(name)).await {
            Ok(()) => {
                tracing::info!(source = %name, "snapshot purged");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SnapshotError::io(name, e)),
        };
        drop(guard);
        self.release_lock(name, &lock);
        res
    }
}

/// In-memory store with the same contract; handy for tests and embedding.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<HashMap<String, Vec<String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, name: &str) -> Vec<String> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.get(name).cloned().unwrap_or_default()
    }

    async fn save(&self, name: &str, lines: &[String]) -> Result<(), SnapshotError> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(name.to_string(), lines.to_vec());
        Ok(())
    }

    async fn purge(&self, name: &str) -> Result<bool, SnapshotError> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(map.remove(name).is_some())
    }
}

/// Injective, directory-safe file stem for a source name.
///
/// `[A-Za-z0-9 _-]` and non-leading dots pass through; every other byte
/// (including `%`, path separators, non-ASCII and a leading dot) becomes `%XX`.
/// The empty name maps to a lone `%`, which no encoded name can produce.
fn file_stem(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(name.len());
    for (i, b) in name.bytes().enumerate() {
        let keep = b.is_ascii_alphanumeric()
            || matches!(b, b' ' | b'_' | b'-')
            || (b == b'.' && i > 0);
        if keep {
            stem.push(b as char);
        } else {
            stem.push_str(&format!("%{b:02X}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path().join("snaps"));
        assert!(store.load("Nobody").await.is_empty());
    }

    #[tokio::test]
    async fn save_creates_dir_and_round_trips_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path().join("nested").join("snaps"));
        let s = lines(&["b", "a", "b", ""]);
        store.save("Acme", &s).await.unwrap();
        assert_eq!(store.load("Acme").await, s);

        let fetched = lines(&["a", "new"]);
        assert_eq!(diff(&store.load("Acme").await, &fetched), diff(&s, &fetched));
    }

    #[tokio::test]
    async fn save_overwrites_previous() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        store.save("Acme", &lines(&["old"])).await.unwrap();
        store.save("Acme", &lines(&["new"])).await.unwrap();
        assert_eq!(store.load("Acme").await, lines(&["new"]));
        assert!(!store.path_for("Acme").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        std::fs::write(store.path_for("Acme"), b"{not json").unwrap();
        assert!(store.load("Acme").await.is_empty());
    }

    #[tokio::test]
    async fn purge_reports_existence() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        store.save("Acme", &lines(&["x"])).await.unwrap();
        assert!(store.purge("Acme").await.unwrap());
        assert!(!store.purge("Acme").await.unwrap());
        assert!(store.load("Acme").await.is_empty());
    }

    #[test]
    fn names_cannot_escape_the_directory() {
        assert_eq!(file_stem("GitHub"), "GitHub");
        assert_eq!(file_stem("Vercel v2.0"), "Vercel v2.0");
        assert_eq!(file_stem("../etc/passwd"), "%2E.%2Fetc%2Fpasswd");
        assert_eq!(file_stem("a/b"), "a%2Fb");
        assert_eq!(file_stem("Über"), "%C3%9Cber");
        assert_eq!(file_stem(""), "%");
    }

    #[test]
    fn distinct_names_get_distinct_stems() {
        let names = ["Über", "Äber", "a/b", "a_b", "a%2Fb", "", "%", ".x", "%2Ex", "_"];
        let stems: std::collections::HashSet<String> =
            names.iter().map(|n| file_stem(n)).collect();
        assert_eq!(stems.len(), names.len());
    }

    #[tokio::test]
    async fn lookalike_names_keep_separate_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        store.save("Über", &lines(&["u"])).await.unwrap();
        store.save("Äber", &lines(&["a"])).await.unwrap();
        store.save("a/b", &lines(&["slash"])).await.unwrap();
        store.save("a_b", &lines(&["underscore"])).await.unwrap();

        assert_eq!(store.load("Über").await, lines(&["u"]));
        assert_eq!(store.load("Äber").await, lines(&["a"]));
        assert_eq!(store.load("a/b").await, lines(&["slash"]));
        assert_eq!(store.load("a_b").await, lines(&["underscore"]));
        assert!(store.path_for("a/b").starts_with(tmp.path()));
    }

    #[tokio::test]
    async fn purge_drops_the_name_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        store.save("Acme", &lines(&["x"])).await.unwrap();
        store.save("Globex", &lines(&["y"])).await.unwrap();
        assert_eq!(store.lock_count(), 2);
        store.purge("Acme").await.unwrap();
        assert_eq!(store.lock_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_honours_contract() {
        let store = MemorySnapshotStore::new();
        assert!(store.load("x").await.is_empty());
        store.save("x", &lines(&["1", "2"])).await.unwrap();
        assert_eq!(store.load("x").await, lines(&["1", "2"]));
        assert!(store.purge("x").await.unwrap());
        assert!(!store.purge("x").await.unwrap());
    }
}
