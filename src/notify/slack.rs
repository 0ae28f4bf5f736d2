use std::time::Duration;

use reqwest::Client;

use super::{Notification, Notifier};
use crate::config::settings::env_nonempty;
use crate::error::DeliveryError;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// `None` when `SLACK_WEBHOOK` is unset.
    pub fn from_env() -> Option<Self> {
        env_nonempty("SLACK_WEBHOOK").map(Self::new)
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, msg: &Notification) -> Result<(), DeliveryError> {
        let body = serde_json::json!({ "text": msg.text });
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
