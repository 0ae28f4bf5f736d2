// tests/metrics.rs
//
// One process-wide recorder per test binary, so everything lives in a single test.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use changelog_monitor::config::SummarizerOptions;
use changelog_monitor::error::FetchError;
use changelog_monitor::fetch::Fetcher;
use changelog_monitor::metrics::Metrics;
use changelog_monitor::notify::NotifierMux;
use changelog_monitor::snapshot::MemorySnapshotStore;
use changelog_monitor::summarize::Summarizer;
use changelog_monitor::{Pipeline, Source};

struct OneGoodOneBad;

#[async_trait]
impl Fetcher for OneGoodOneBad {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url.contains("good") {
            Ok("first\nsecond".into())
        } else {
            Err(FetchError::Empty)
        }
    }
}

#[tokio::test]
async fn metrics_endpoint_exposes_pass_counters() {
    let metrics = Metrics::init().expect("recorder installs once per binary");

    let pipeline = Pipeline::new(
        Arc::new(MemorySnapshotStore::new()),
        Arc::new(OneGoodOneBad),
        Arc::new(Summarizer::new(None, SummarizerOptions::default())),
        Arc::new(NotifierMux::new(Vec::new())),
    );
    pipeline
        .run_pass(&[
            Source::new("Good", "http://good.example/log"),
            Source::new("Bad", "http://bad.example/log"),
        ])
        .await;

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "monitor_fetch_errors_total 1",
        "monitor_new_lines_total 2",
        "monitor_summaries_total{kind=\"fallback_not_configured\"} 1",
        "monitor_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }
    assert!(text.contains("# HELP monitor_new_lines_total"));
}
