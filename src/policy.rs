// src/policy.rs
//! URL-safety policy applied to sources before they are fetched.

use crate::types::Source;

pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "porn",
    "xxx",
    "adult",
    "redtube",
    "xvideos",
    "onlyfans",
    "chaturbate",
    "brazzers",
    "xnxx",
    "pornhub",
];

/// Host keyword blocklist with an allowlist that always wins.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    blocked: Vec<String>,
    allowed: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_BLOCKED_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            Vec::new(),
        )
    }
}

impl UrlPolicy {
    pub fn new(blocked: Vec<String>, allowed: Vec<String>) -> Self {
        Self {
            blocked: clean(blocked),
            allowed: clean(allowed),
        }
    }

    /// Default blocklist, extended by `NSFW_KEYWORDS`, with `NSFW_ALLOWLIST` hosts.
    pub fn from_env() -> Self {
        let mut blocked: Vec<String> =
            DEFAULT_BLOCKED_KEYWORDS.iter().map(|s| s.to_string()).collect();
        blocked.extend(env_list("NSFW_KEYWORDS"));
        Self::new(blocked, env_list("NSFW_ALLOWLIST"))
    }

    /// True when the URL's host matches a blocked keyword and no allowlist entry.
    /// URLs without a parseable host are blocked.
    pub fn is_blocked(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return true;
        };
        if self.allowed.iter().any(|a| host.contains(a.as_str())) {
            return false;
        }
        self.blocked.iter().any(|kw| host.contains(kw.as_str()))
    }

    /// Split `sources` into (kept, removed), preserving order.
    pub fn filter(&self, sources: Vec<Source>) -> (Vec<Source>, Vec<Source>) {
        let (removed, kept): (Vec<_>, Vec<_>) = sources
            .into_iter()
            .partition(|s| self.is_blocked(&s.changelog));
        if !removed.is_empty() {
            let names: Vec<&str> = removed.iter().map(|s| s.name.as_str()).collect();
            tracing::warn!(skipped = ?names, "sources blocked by URL policy");
        }
        (kept, removed)
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}
