// src/error.rs
//! Typed error kinds for every external dependency of a monitoring pass.
//!
//! Only [`RunError`] is fatal to a run; everything else is recovered where it
//! happens (skip the source, fall back to the digest, log the sink failure).

use thiserror::Error;

/// Fetching a changelog page failed. The source is skipped for this run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    Empty,

    #[error("http client setup: {0}")]
    Client(String),
}

/// Persisted snapshot could not be read or written.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O for '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot for '{name}' is corrupt: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    pub fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    pub fn corrupt(name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            name: name.into(),
            source,
        }
    }
}

/// The text-generation service could not produce a summary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarizer credential not configured")]
    NotConfigured,

    #[error("summarizer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("summarizer HTTP status {0}")]
    Status(u16),

    #[error("summarizer returned an empty completion")]
    EmptyResponse,

    #[error("summarizer client unavailable: {0}")]
    Client(String),
}

/// A notification sink rejected or never received the message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sink request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("sink misconfigured: {0}")]
    Config(String),
}

/// The only condition that fails a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot enumerate sources: {0}")]
    Sources(String),
}

/// Rejected edit of the competitor catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Competitor not found")]
    NotFound,

    #[error("name and changelog URL required")]
    Missing,

    #[error("competitor '{0}' already exists")]
    Duplicate(String),

    #[error("URL blocked by NSFW policy")]
    Blocked,
}

/// Outcome of asking the monitor to start a run.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Monitor already running")]
    AlreadyRunning,

    #[error("Monitor failed: {0}")]
    Failed(#[from] RunError),
}
