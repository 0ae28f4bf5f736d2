// src/config/settings.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::snapshot::DEFAULT_SNAPSHOT_DIR;

pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Process-level knobs for the monitor, read from the environment.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub snapshot_dir: PathBuf,
    /// Summarize and notify even when a pass found nothing new.
    pub always_notify: bool,
    pub interval: Duration,
    pub fetch_timeout_secs: u64,
    pub tls_insecure_retry: bool,
    pub scheduler_enabled: bool,
    pub static_dir: PathBuf,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            always_notify: false,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            tls_insecure_retry: false,
            scheduler_enabled: true,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl MonitorSettings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            snapshot_dir: std::env::var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.snapshot_dir),
            always_notify: env_bool("ALWAYS_NOTIFY").unwrap_or(d.always_notify),
            interval: env_parse::<u64>("MONITOR_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.interval),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS").unwrap_or(d.fetch_timeout_secs),
            tls_insecure_retry: env_bool("FETCH_TLS_INSECURE_RETRY")
                .unwrap_or(d.tls_insecure_retry),
            scheduler_enabled: env_bool("SCHEDULER_ENABLED").unwrap_or(d.scheduler_enabled),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.static_dir),
        }
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive; anything else is `None`.
pub fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Non-empty, trimmed env value.
pub fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
