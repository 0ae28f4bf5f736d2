// src/notify/notion.rs
//! Workspace-database sink: one Notion page per summary, in a configured database.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use super::{Notification, Notifier};
use crate::config::settings::env_nonempty;
use crate::error::DeliveryError;
use crate::summarize::truncate_chars;

const PAGES_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich-text segments longer than this.
const MAX_BLOCK_CHARS: usize = 2000;
const MAX_BLOCKS: usize = 100;

pub struct NotionNotifier {
    token: String,
    database_id: String,
    endpoint: String,
    client: Client,
}

impl NotionNotifier {
    pub fn new(token: String, database_id: String) -> Self {
        Self {
            token,
            database_id,
            endpoint: PAGES_URL.to_string(),
            client: Client::new(),
        }
    }

    /// `None` unless both `NOTION_TOKEN` and `NOTION_DB_ID` are set.
    pub fn from_env() -> Option<Self> {
        let token = env_nonempty("NOTION_TOKEN")?;
        let db = env_nonempty("NOTION_DB_ID")?;
        Some(Self::new(token, db))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Page-creation payload: title in the `Name` property, body as paragraphs.
pub fn page_payload(database_id: &str, title: &str, text: &str) -> Value {
    let children: Vec<Value> = split_blocks(text)
        .into_iter()
        .map(|chunk| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{ "type": "text", "text": { "content": chunk } }]
                }
            })
        })
        .collect();

    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Name": { "title": [{ "text": { "content": truncate_chars(title, MAX_BLOCK_CHARS) } }] }
        },
        "children": children,
    })
}

/// Chunks of at most `MAX_BLOCK_CHARS`, split on char boundaries.
fn split_blocks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_BLOCK_CHARS)
        .take(MAX_BLOCKS)
        .map(|c| c.iter().collect())
        .collect()
}

#[async_trait::async_trait]
impl Notifier for NotionNotifier {
    async fn send(&self, msg: &Notification) -> Result<(), DeliveryError> {
        if self.database_id.is_empty() {
            return Err(DeliveryError::Config("empty Notion database id".into()));
        }
        let body = page_payload(&self.database_id, &msg.title, &msg.text);
        self.client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(15))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "notion"
    }
}
