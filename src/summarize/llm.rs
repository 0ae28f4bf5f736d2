//! Text-generation providers used by the summarizer.
//!
//! `ChatCompletionsProvider` speaks the OpenAI-compatible chat-completions
//! protocol (Groq by default). Callers hold a `DynProvider` so tests can swap in
//! a mock or a failing provider without touching the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SummarizerOptions;
use crate::error::SummarizeError;

pub const ENV_API_KEY: &str = "GROQ_API_KEY";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One completion request: fixed system instruction plus the shaped prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>>;

pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(&'a self, req: CompletionRequest<'a>) -> CompletionFuture<'a>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn CompletionProvider>;

/// Build the chat-completions provider if `GROQ_API_KEY` is set, else `None`
/// (the summarizer then reports "not configured"). A key whose client cannot
/// be built still counts as configured; its summaries fall back as service errors.
pub fn provider_from_env(options: &SummarizerOptions) -> Option<DynProvider> {
    let key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty())?;
    Some(provider_or_unavailable(ChatCompletionsProvider::new(
        key,
        &options.endpoint,
    )))
}

fn provider_or_unavailable(built: Result<ChatCompletionsProvider, SummarizeError>) -> DynProvider {
    match built {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::warn!(error = %e, "summarizer client could not be built");
            Arc::new(UnavailableProvider::new(e.to_string()))
        }
    }
}

pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ChatCompletionsProvider {
    pub fn new(api_key: String, endpoint: &str) -> Result<Self, SummarizeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("changelog-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: endpoint.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionProvider for ChatCompletionsProvider {
    fn complete<'a>(&'a self, req: CompletionRequest<'a>) -> CompletionFuture<'a> {
        Box::pin(async move {
            let body = Req {
                model: req.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: req.system,
                    },
                    Msg {
                        role: "user",
                        content: req.user,
                    },
                ],
                temperature: req.temperature,
                max_tokens: req.max_tokens,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(SummarizeError::Status(status.as_u16()));
            }
            let parsed: Resp = resp.json().await?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            if content.is_empty() {
                return Err(SummarizeError::EmptyResponse);
            }
            Ok(content)
        })
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

/// Stands in for a configured provider whose client failed to build.
/// Every completion fails with the build error.
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CompletionProvider for UnavailableProvider {
    fn complete<'a>(&'a self, _req: CompletionRequest<'a>) -> CompletionFuture<'a> {
        let reason = self.reason.clone();
        Box::pin(async move { Err(SummarizeError::Client(reason)) })
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Returns a fixed completion; for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl CompletionProvider for MockProvider {
    fn complete<'a>(&'a self, _req: CompletionRequest<'a>) -> CompletionFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
