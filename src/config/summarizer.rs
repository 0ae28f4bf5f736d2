// src/config/summarizer.rs
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use super::settings::{env_nonempty, env_parse};

pub const DEFAULT_SUMMARIZER_CONFIG_PATH: &str = "config/summarizer.json";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_output_tokens() -> u32 {
    300
}
fn default_max_items_per_source() -> usize {
    50
}
fn default_max_item_chars() -> usize {
    500
}
fn default_max_prompt_chars() -> usize {
    20_000
}

/// Shaping limits and call parameters for the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerOptions {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible chat-completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// In `[0, 1]`; out-of-range values are reset to 0.2.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,
    #[serde(default = "default_max_item_chars")]
    pub max_item_chars: usize,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_items_per_source: default_max_items_per_source(),
            max_item_chars: default_max_item_chars(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

impl SummarizerOptions {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: SummarizerOptions = serde_json::from_str(&data)?;
        Ok(cfg.sanitized())
    }

    /// Optional `config/summarizer.json`, then env overrides
    /// (`GROQ_MODEL`, `SUMMARIZER_ENDPOINT`, `SUMMARIZER_MAX_ITEMS`,
    /// `SUMMARIZER_MAX_PROMPT_CHARS`).
    pub fn from_env() -> Self {
        let mut cfg = match Self::load_from_file(DEFAULT_SUMMARIZER_CONFIG_PATH) {
            Ok(c) => c,
            Err(e) => {
                if Path::new(DEFAULT_SUMMARIZER_CONFIG_PATH).exists() {
                    tracing::warn!(error = %e, "ignoring invalid summarizer config");
                }
                Self::default()
            }
        };
        if let Some(m) = env_nonempty("GROQ_MODEL") {
            cfg.model = m;
        }
        if let Some(u) = env_nonempty("SUMMARIZER_ENDPOINT") {
            cfg.endpoint = u;
        }
        if let Some(n) = env_parse("SUMMARIZER_MAX_ITEMS") {
            cfg.max_items_per_source = n;
        }
        if let Some(n) = env_parse("SUMMARIZER_MAX_PROMPT_CHARS") {
            cfg.max_prompt_chars = n;
        }
        cfg.sanitized()
    }

    fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_output_tokens == 0 {
            self.max_output_tokens = default_max_output_tokens();
        }
        if self.max_item_chars == 0 {
            self.max_item_chars = default_max_item_chars();
        }
        self
    }
}
