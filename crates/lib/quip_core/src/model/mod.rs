//! Chat model providers.
//!
//! A [`ChatModel`] is the terminal stage of every advisor chain. Providers:
//!
//! - `"openai"` — OpenAI-compatible `/chat/completions` over HTTP
//! - `"local"` — deterministic echo (offline, no external deps)

pub mod config;
pub mod local;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::chat::{ChatError, ChatRequest, ChatResponse};

pub use config::ModelConfig;
pub use local::LocalChatModel;
pub use openai::OpenAiChatModel;

/// Lazy sequence of response chunks. Dropping it cancels the upstream call.
pub type ChatStream = BoxStream<'static, Result<ChatResponse, ChatError>>;

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run the request to completion and return the whole result.
    async fn call(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Start a streamed call. Nothing is sent until the stream is polled.
    fn stream(&self, request: ChatRequest) -> ChatStream;
}

/// Build the model selected by `config.provider`.
pub fn build_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ChatError> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalChatModel::new(&config.model))),
        "openai" => Ok(Arc::new(OpenAiChatModel::new(config)?)),
        other => Err(ChatError::Config(format!("Unsupported provider: {other}"))),
    }
}
