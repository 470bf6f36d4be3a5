//! Model configuration resolution.

use std::env;

use crate::chat::ChatOptions;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Resolved settings for which chat provider/model to use.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Provider name: `"openai"` or `"local"`.
    pub provider: String,
    /// Model name sent to the provider.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (no trailing `/chat/completions`).
    pub base_url: String,
    /// API key (required when provider is `"openai"`).
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ModelConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable           | Default                                   |
    /// |--------------------|-------------------------------------------|
    /// | `CHAT_PROVIDER`    | `openai` if `OPENAI_API_KEY` set, `local` |
    /// | `CHAT_MODEL`       | `gpt-4o-mini`                             |
    /// | `OPENAI_BASE_URL`  | `https://api.openai.com/v1`               |
    /// | `OPENAI_API_KEY`   | unset                                     |
    /// | `CHAT_TEMPERATURE` | provider default                          |
    /// | `CHAT_MAX_TOKENS`  | provider default                          |
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        Self {
            provider: env::var("CHAT_PROVIDER")
                .unwrap_or_else(|_| default_provider(api_key.is_some()).to_string()),
            model: env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.into()),
            api_key,
            temperature: env::var("CHAT_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_tokens: env::var("CHAT_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Options applied to every request unless the caller overrides them.
    pub fn default_options(&self) -> ChatOptions {
        ChatOptions {
            model: Some(self.model.clone()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Auto-select `openai` when a key is available.
pub fn default_provider(has_api_key: bool) -> &'static str {
    if has_api_key { "openai" } else { "local" }
}
