// src/notify/mod.rs
//! Notification dispatch: one summary, fanned out to every configured sink.
//! Sinks are independent; a failure is logged and reported, never raised.

pub mod email;
pub mod notion;
pub mod slack;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::error::DeliveryError;

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl Notification {
    pub fn new(text: impl Into<String>) -> Self {
        let ts = Utc::now();
        Self {
            title: format!("Competitor updates {}", ts.format("%Y-%m-%d %H:%M UTC")),
            text: text.into(),
            ts,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &Notification) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub sink: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fan-out over configured sinks.
#[derive(Default)]
pub struct NotifierMux {
    sinks: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(sinks: Vec<Box<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    /// Slack (`SLACK_WEBHOOK`), Notion (`NOTION_TOKEN` + `NOTION_DB_ID`) and
    /// email (`SMTP_*`), each only when its settings are present.
    pub fn from_env() -> Self {
        let mut sinks: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(s) = slack::SlackNotifier::from_env() {
            sinks.push(Box::new(s));
        }
        if let Some(n) = notion::NotionNotifier::from_env() {
            sinks.push(Box::new(n));
        }
        match email::EmailNotifier::from_env() {
            Ok(Some(e)) => sinks.push(Box::new(e)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "email sink disabled"),
        }
        if sinks.is_empty() {
            tracing::warn!("no notification sinks configured; summaries will only be logged");
        }
        Self { sinks }
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, msg: &Notification) -> Vec<DeliveryOutcome> {
        let mut out = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            match sink.send(msg).await {
                Ok(()) => {
                    tracing::info!(sink = sink.name(), "notification delivered");
                    out.push(DeliveryOutcome {
                        sink: sink.name(),
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(sink = sink.name(), error = %e, "notification failed");
                    counter!("monitor_delivery_failures_total", "sink" => sink.name())
                        .increment(1);
                    out.push(DeliveryOutcome {
                        sink: sink.name(),
                        ok: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        out
    }
}
