use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::dashboard::{Analytics, CompetitorPatch};
use crate::error::{CatalogError, TriggerError};
use crate::monitor::Monitor;
use crate::run_state::Trigger;
use crate::summarize::NO_CHANGES_MESSAGE;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }
}

/// API routes only (no static files); what the tests drive.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route(
            "/api/competitors",
            get(list_competitors).post(add_competitor),
        )
        .route(
            "/api/competitors/{id}",
            put(update_competitor).delete(delete_competitor),
        )
        .route("/api/changes", get(list_changes))
        .route("/api/run-monitor", post(run_monitor))
        .route("/api/status", get(status))
        .route("/api/analytics", get(analytics))
        .route("/api/settings", get(settings))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// API routes plus the dashboard frontend served from `static_dir`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    router(state).fallback_service(ServeDir::new(static_dir))
}

fn error_json(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

fn catalog_error(e: CatalogError) -> Response {
    let status = match e {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::Duplicate(_) => StatusCode::CONFLICT,
        CatalogError::Missing | CatalogError::Blocked => StatusCode::BAD_REQUEST,
    };
    error_json(status, e.to_string())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn dashboard(State(state): State<AppState>) -> Json<Value> {
    let d = state.monitor.dashboard();
    let (total, active, last_24h) = d.counts();
    Json(json!({
        "totalCompetitors": total,
        "activeCompetitors": active,
        "recentChanges24h": last_24h,
        "systemStatus": state.monitor.guard().status(),
        "recentActivity": d.recent(10),
    }))
}

async fn list_competitors(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "competitors": state.monitor.dashboard().competitors() }))
}

#[derive(Deserialize, Default)]
struct NewCompetitor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    changelog: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

async fn add_competitor(
    State(state): State<AppState>,
    Json(body): Json<NewCompetitor>,
) -> Response {
    let url = body.changelog.or(body.url).unwrap_or_default();
    match state
        .monitor
        .add_competitor(&body.name, &url, body.description)
    {
        Ok(c) => Json(json!({ "success": true, "competitor": c })).into_response(),
        Err(e) => catalog_error(e),
    }
}

async fn update_competitor(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<usize>,
    Json(patch): Json<CompetitorPatch>,
) -> Response {
    match state.monitor.update_competitor(id, patch).await {
        Ok(c) => Json(json!({ "success": true, "competitor": c })).into_response(),
        Err(e) => catalog_error(e),
    }
}

async fn delete_competitor(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<usize>,
) -> Response {
    match state.monitor.delete_competitor(id).await {
        Ok((_, removed)) => {
            Json(json!({ "success": true, "removed_changes": removed })).into_response()
        }
        Err(e) => catalog_error(e),
    }
}

async fn list_changes(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let competitor = q.get("competitor").map(String::as_str).filter(|c| !c.is_empty());
    let days = q
        .get("days")
        .and_then(|d| d.trim().parse::<i64>().ok())
        .unwrap_or(7);
    Json(json!({ "changes": state.monitor.dashboard().changes(competitor, days) }))
}

async fn run_monitor(State(state): State<AppState>) -> Response {
    match state.monitor.trigger(Trigger::Manual).await {
        Ok(report) => {
            let (summary, kind) = match &report.summary {
                Some(s) => (s.text.clone(), s.kind.label()),
                None => (NO_CHANGES_MESSAGE.to_string(), "skipped"),
            };
            let message = if report.changes.is_empty() {
                "No changes detected".to_string()
            } else {
                format!("Found changes for {} competitors", report.changes.len())
            };
            Json(json!({
                "success": true,
                "summary": summary,
                "summaryKind": kind,
                "changes": report.changes,
                "skipped": report.skipped,
                "deliveries": report.deliveries,
                "message": message,
            }))
            .into_response()
        }
        Err(e @ TriggerError::AlreadyRunning) => error_json(StatusCode::CONFLICT, e.to_string()),
        Err(e @ TriggerError::Failed(_)) => {
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": state.monitor.guard().status() }))
}

async fn analytics(State(state): State<AppState>) -> Json<Analytics> {
    Json(state.monitor.dashboard().analytics())
}

/// Configuration flags only; secrets are reported as present/absent.
async fn settings(State(state): State<AppState>) -> Json<Value> {
    let pipeline = state.monitor.pipeline();
    let opts = pipeline.summarizer().options();
    Json(json!({
        "summarizerConfigured": pipeline.summarizer().is_configured(),
        "summarizerModel": opts.model,
        "sinks": pipeline.notifier().sink_names(),
        "alwaysNotify": pipeline.always_notify(),
        "maxLinesPerCompetitor": opts.max_items_per_source,
        "maxPromptChars": opts.max_prompt_chars,
        "monitoringIntervalSecs": state.monitor.interval().as_secs(),
    }))
}
