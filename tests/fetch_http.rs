// tests/fetch_http.rs
//
// HttpFetcher against a local axum server: status mapping, blank bodies,
// the user agent, and when the insecure retry does and does not kick in.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;

use changelog_monitor::error::FetchError;
use changelog_monitor::fetch::{Fetcher, HttpFetcher, USER_AGENT};

async fn serve(hits: Arc<AtomicUsize>) -> SocketAddr {
    let broken = {
        let hits = hits.clone();
        move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (StatusCode::INTERNAL_SERVER_ERROR, "boom")
        }
    };
    let app = Router::new()
        .route("/changelog", get(|| async { "v2.1 released\nv2.0 released" }))
        .route("/blank", get(|| async { "   \n\t " }))
        .route("/ua", get(|headers: HeaderMap| async move {
            headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        }))
        .route("/broken", get(broken));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetcher(insecure_retry: bool) -> HttpFetcher {
    HttpFetcher::new(5, insecure_retry).expect("client builds")
}

#[tokio::test]
async fn returns_the_page_body() {
    let addr = serve(Arc::default()).await;
    let body = fetcher(false)
        .fetch(&format!("http://{addr}/changelog"))
        .await
        .unwrap();
    assert_eq!(body, "v2.1 released\nv2.0 released");
}

#[tokio::test]
async fn blank_body_is_an_error() {
    let addr = serve(Arc::default()).await;
    let err = fetcher(false)
        .fetch(&format!("http://{addr}/blank"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Empty), "got {err:?}");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let addr = serve(Arc::default()).await;
    let err = fetcher(false)
        .fetch(&format!("http://{addr}/missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status(404)), "got {err:?}");
}

#[tokio::test]
async fn sends_the_monitor_user_agent() {
    let addr = serve(Arc::default()).await;
    let ua = fetcher(false)
        .fetch(&format!("http://{addr}/ua"))
        .await
        .unwrap();
    assert_eq!(ua, USER_AGENT);
}

#[tokio::test]
async fn server_errors_are_not_retried_insecurely() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = serve(hits.clone()).await;
    let err = fetcher(true)
        .fetch(&format!("http://{addr}/broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status(500)), "got {err:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refused_connection_surfaces_as_transport_error() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    for insecure_retry in [false, true] {
        let err = fetcher(insecure_retry)
            .fetch(&format!("http://{addr}/changelog"))
            .await
            .unwrap_err();
        match err {
            FetchError::Http(e) => assert!(e.is_connect(), "not a connect error: {e}"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
