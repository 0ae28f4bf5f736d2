// tests/summarize_fallback.rs
//
// Summarizer provenance: generated vs. fallback, and the request shape the
// provider actually receives. Providers here are in-process stand-ins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use changelog_monitor::config::SummarizerOptions;
use changelog_monitor::error::SummarizeError;
use changelog_monitor::summarize::llm::{
    CompletionFuture, CompletionProvider, CompletionRequest, DynProvider, MockProvider,
    UnavailableProvider,
};
use changelog_monitor::summarize::{
    FallbackReason, Summarizer, SummaryKind, NOT_CONFIGURED_MARKER, NO_CHANGES_MESSAGE,
    SERVICE_ERROR_MARKER,
};
use changelog_monitor::ChangeSet;

/// Counts calls and remembers the last prompt; answers with `reply`.
struct Scripted {
    calls: AtomicUsize,
    last_user: Mutex<Option<String>>,
    reply: Result<String, u16>,
}

impl Scripted {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(None),
            reply: Ok(text.to_string()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(None),
            reply: Err(status),
        })
    }
}

impl CompletionProvider for Scripted {
    fn complete<'a>(&'a self, req: CompletionRequest<'a>) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user.lock().unwrap() = Some(req.user.to_string());
        let reply = self.reply.clone();
        Box::pin(async move { reply.map_err(SummarizeError::Status) })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn acme_changes(n: usize) -> ChangeSet {
    let mut cs = ChangeSet::new();
    cs.insert("Acme", (1..=n).map(|i| format!("entry {i}")).collect());
    cs
}

#[tokio::test]
async fn missing_credential_uses_not_configured_fallback() {
    let s = Summarizer::new(None, SummarizerOptions::default());
    assert!(!s.is_configured());

    let out = s.summarize(&acme_changes(2)).await;
    assert_eq!(out.kind, SummaryKind::Fallback(FallbackReason::NotConfigured));
    assert!(out.text.starts_with(NOT_CONFIGURED_MARKER), "{}", out.text);
    assert!(out.text.contains("(Fallback summary)"));
    assert!(out.text.contains("Acme: 2 change(s)"));
}

#[tokio::test]
async fn provider_failure_uses_error_fallback_without_details() {
    let provider = Scripted::failing(502);
    let s = Summarizer::new(Some(provider.clone() as DynProvider), SummarizerOptions::default());

    let out = s.summarize(&acme_changes(7)).await;
    assert_eq!(out.kind, SummaryKind::Fallback(FallbackReason::ServiceError));
    assert!(out.text.starts_with(SERVICE_ERROR_MARKER));
    assert!(!out.text.contains("502"), "error detail must stay out of the text");
    assert!(out.text.contains("  5. entry 5"));
    assert!(!out.text.contains("entry 6"));
    assert!(out.text.contains("  ... 2 more"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unbuildable_client_is_a_service_error_not_missing_credentials() {
    let provider = Arc::new(UnavailableProvider::new("tls backend missing")) as DynProvider;
    let s = Summarizer::new(Some(provider), SummarizerOptions::default());

    let out = s.summarize(&acme_changes(2)).await;
    assert_eq!(out.kind, SummaryKind::Fallback(FallbackReason::ServiceError));
    assert!(out.text.starts_with(SERVICE_ERROR_MARKER));
    assert!(!out.text.starts_with(NOT_CONFIGURED_MARKER));
    assert!(!out.text.contains("tls backend"));
}

#[tokio::test]
async fn blank_completion_counts_as_failure() {
    let provider = Scripted::ok("   \n ");
    let s = Summarizer::new(Some(provider as DynProvider), SummarizerOptions::default());

    let out = s.summarize(&acme_changes(1)).await;
    assert_eq!(out.kind, SummaryKind::Fallback(FallbackReason::ServiceError));
}

#[tokio::test]
async fn generated_summary_is_returned_trimmed() {
    let provider = Arc::new(MockProvider {
        fixed: "  - Acme shipped entry 1\n".into(),
    });
    let s = Summarizer::new(Some(provider as DynProvider), SummarizerOptions::default());

    let out = s.summarize(&acme_changes(1)).await;
    assert_eq!(out.kind, SummaryKind::Generated);
    assert_eq!(out.text, "- Acme shipped entry 1");
}

#[tokio::test]
async fn empty_changeset_never_reaches_the_provider() {
    let provider = Scripted::ok("should not be used");
    let s = Summarizer::new(Some(provider.clone() as DynProvider), SummarizerOptions::default());

    let out = s.summarize(&ChangeSet::new()).await;
    assert_eq!(out.kind, SummaryKind::NoChanges);
    assert_eq!(out.text, NO_CHANGES_MESSAGE);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_sees_bounded_prompt() {
    let provider = Scripted::ok("ok");
    let s = Summarizer::new(Some(provider.clone() as DynProvider), SummarizerOptions::default());

    let mut cs = ChangeSet::new();
    let mut lines: Vec<String> = (1..=60).map(|i| format!("item {i}")).collect();
    lines[0] = "x".repeat(800);
    cs.insert("Acme", lines);
    s.summarize(&cs).await;

    let prompt = provider.last_user.lock().unwrap().clone().expect("prompt");
    assert!(prompt.starts_with("Acme Updates (60 new lines):"));
    assert!(prompt.contains(&format!("1. {}\n", "x".repeat(500))));
    assert!(prompt.contains("50. item 50"));
    assert!(!prompt.contains("51. item 51"));
    assert!(prompt.contains("... 10 more not shown"));
}
