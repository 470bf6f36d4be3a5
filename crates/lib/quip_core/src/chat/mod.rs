//! Chat data model — requests, responses and streamed chunks.
//!
//! A streamed reply is a sequence of [`ChatResponse`] values, each carrying
//! only its own slice of text. [`aggregate::MessageAggregator`] folds such a
//! sequence back into one logical response.

pub mod aggregate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while talking to a chat model.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Provider options. `None` leaves the provider default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(&self, overrides: &ChatOptions) -> ChatOptions {
        ChatOptions {
            model: overrides.model.clone().or_else(|| self.model.clone()),
            temperature: overrides.temperature.or(self.temperature),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
        }
    }
}

/// Outbound message bundle for one model call.
///
/// Immutable once built; every request gets a fresh id so that interleaved
/// log lines from concurrent calls can be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    id: Uuid,
    messages: Vec<Message>,
    options: ChatOptions,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, options: ChatOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages,
            options,
        }
    }

    /// Single-turn request holding one user message.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)], ChatOptions::default())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Text of the most recent user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Generated assistant output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub content: String,
    pub finish_reason: Option<String>,
}

/// Provider metadata attached to a response or chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub id: Option<String>,
    pub model: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub usage: Option<Usage>,
}

/// A completed model result, or one chunk of a streamed one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub result: Option<Generation>,
    pub metadata: ResponseMetadata,
}

impl ChatResponse {
    pub fn new(result: Option<Generation>, metadata: ResponseMetadata) -> Self {
        Self { result, metadata }
    }

    /// Generated text, if the provider returned a result.
    pub fn content(&self) -> Option<&str> {
        self.result.as_ref().map(|g| g.content.as_str())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.result.as_ref().and_then(|g| g.finish_reason.as_deref())
    }
}
