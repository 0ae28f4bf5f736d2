// src/summarize/mod.rs
//! Summary generator: ChangeSet -> one bounded, human-readable report.
//!
//! All truncation lives here so the pipeline, the CLI and the dashboard API see
//! identical shaping. `summarize` never fails: every provider problem resolves
//! to the deterministic fallback digest.

pub mod llm;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

pub use crate::config::SummarizerOptions;
use crate::error::SummarizeError;
use crate::types::ChangeSet;
use llm::{CompletionRequest, DynProvider};

pub const NO_CHANGES_MESSAGE: &str = "No new changes detected this run.";
pub const TRUNCATED_MARKER: &str = "\n...[truncated]...";
pub const NOT_CONFIGURED_MARKER: &str = "[Summarizer not configured]";
pub const SERVICE_ERROR_MARKER: &str = "[Summarizer error]";

/// Lines shown per source in the fallback digest, and their char budget.
pub const FALLBACK_MAX_SHOW: usize = 5;
pub const FALLBACK_ITEM_CHARS: usize = 200;

pub const SYSTEM_PROMPT: &str = "You are a product intelligence assistant. Summarize competitor updates \
as concise bullet points grouped by competitor. Highlight new features, pricing changes, plan tier \
changes, deprecations, major UX improvements, and messaging shifts. If noise (minor fixes/docs) \
dominates, condense.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NotConfigured,
    ServiceError,
}

/// Where the summary text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum SummaryKind {
    NoChanges,
    Generated,
    Fallback(FallbackReason),
}

impl SummaryKind {
    pub fn label(&self) -> &'static str {
        match self {
            SummaryKind::NoChanges => "no_changes",
            SummaryKind::Generated => "generated",
            SummaryKind::Fallback(FallbackReason::NotConfigured) => "fallback_not_configured",
            SummaryKind::Fallback(FallbackReason::ServiceError) => "fallback_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub text: String,
    pub kind: SummaryKind,
}

pub struct Summarizer {
    provider: Option<DynProvider>,
    options: SummarizerOptions,
}

impl Summarizer {
    /// `provider == None` means no credential: always the "not configured" fallback.
    pub fn new(provider: Option<DynProvider>, options: SummarizerOptions) -> Self {
        Self { provider, options }
    }

    /// Options from config/env, provider from `GROQ_API_KEY`.
    pub fn from_env() -> Self {
        let options = SummarizerOptions::from_env();
        let provider = llm::provider_from_env(&options);
        tracing::info!(
            model = %options.model,
            configured = provider.is_some(),
            "summarizer ready"
        );
        Self::new(provider, options)
    }

    pub fn options(&self) -> &SummarizerOptions {
        &self.options
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn summarize(&self, changes: &ChangeSet) -> Summary {
        let summary = if changes.is_empty() {
            Summary {
                text: NO_CHANGES_MESSAGE.to_string(),
                kind: SummaryKind::NoChanges,
            }
        } else {
            match self.generate(changes).await {
                Ok(text) => Summary {
                    text,
                    kind: SummaryKind::Generated,
                },
                Err(SummarizeError::NotConfigured) => Summary {
                    text: format!("{NOT_CONFIGURED_MARKER} {}", fallback_summary(changes)),
                    kind: SummaryKind::Fallback(FallbackReason::NotConfigured),
                },
                Err(e) => {
                    // Detail goes to the log only; never into the notification text.
                    tracing::warn!(error = %e, "summarization failed; using fallback");
                    Summary {
                        text: format!("{SERVICE_ERROR_MARKER} {}", fallback_summary(changes)),
                        kind: SummaryKind::Fallback(FallbackReason::ServiceError),
                    }
                }
            }
        };
        counter!("monitor_summaries_total", "kind" => summary.kind.label()).increment(1);
        summary
    }

    async fn generate(&self, changes: &ChangeSet) -> Result<String, SummarizeError> {
        let provider = self.provider.as_ref().ok_or(SummarizeError::NotConfigured)?;
        let prompt = shape_prompt(changes, &self.options);
        let req = CompletionRequest {
            system: SYSTEM_PROMPT,
            user: &prompt,
            model: &self.options.model,
            temperature: self.options.temperature,
            max_tokens: self.options.max_output_tokens,
        };
        tracing::debug!(
            provider = provider.name(),
            prompt_chars = prompt.chars().count(),
            "requesting summary"
        );
        let text = provider.complete(req).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Flatten a ChangeSet into the prompt text sent to the provider.
///
/// Per source: a header with the line total, at most `max_items_per_source`
/// numbered items (each collapsed and cut to `max_item_chars`), an omission note
/// when lines were dropped, then a blank line. The whole text is capped at
/// `max_prompt_chars` with an explicit truncation marker.
pub fn shape_prompt(changes: &ChangeSet, options: &SummarizerOptions) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (name, items) in changes.iter() {
        parts.push(format!("{name} Updates ({} new lines):", items.len()));
        let shown = items.len().min(options.max_items_per_source);
        for (i, item) in items.iter().take(shown).enumerate() {
            let compact = collapse_whitespace(item);
            parts.push(format!(
                "{}. {}",
                i + 1,
                truncate_chars(&compact, options.max_item_chars)
            ));
        }
        if items.len() > shown {
            parts.push(format!("... {} more not shown", items.len() - shown));
        }
        parts.push(String::new());
    }
    let text = parts.join("\n");
    if text.chars().count() > options.max_prompt_chars {
        let mut capped = truncate_chars(&text, options.max_prompt_chars).to_string();
        capped.push_str(TRUNCATED_MARKER);
        capped
    } else {
        text
    }
}

/// Deterministic digest used when the provider is missing or failing.
pub fn fallback_summary(changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return NO_CHANGES_MESSAGE.to_string();
    }
    let mut lines = vec!["(Fallback summary)".to_string()];
    for (name, items) in changes.iter() {
        lines.push(format!("{name}: {} change(s)", items.len()));
        for (i, item) in items.iter().take(FALLBACK_MAX_SHOW).enumerate() {
            let compact = collapse_whitespace(item);
            lines.push(format!(
                "  {}. {}",
                i + 1,
                truncate_chars(&compact, FALLBACK_ITEM_CHARS)
            ));
        }
        if items.len() > FALLBACK_MAX_SHOW {
            lines.push(format!("  ... {} more", items.len() - FALLBACK_MAX_SHOW));
        }
    }
    lines.join("\n")
}

/// Runs of whitespace become a single space; ends are trimmed.
pub fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re.replace_all(s.trim(), " ").into_owned()
}

/// First `max` characters of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
