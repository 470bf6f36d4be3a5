//! Local echo provider.
//!
//! Deterministic and offline: replies with the last user message. Handy for
//! running the server without credentials.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{StreamExt, stream};

use super::{ChatModel, ChatStream};
use crate::chat::{
    ChatError, ChatRequest, ChatResponse, Generation, ResponseMetadata, Usage,
};

const ECHO_PREFIX: &str = "echo: ";

#[derive(Debug, Clone)]
pub struct LocalChatModel {
    model: String,
}

impl LocalChatModel {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }

    fn reply_for(request: &ChatRequest) -> String {
        format!("{ECHO_PREFIX}{}", request.last_user_text().unwrap_or_default())
    }

    fn metadata(&self, request: &ChatRequest, usage: Option<Usage>) -> ResponseMetadata {
        ResponseMetadata {
            id: Some(format!("local-{}", request.id())),
            model: Some(
                request
                    .options()
                    .model
                    .clone()
                    .unwrap_or_else(|| self.model.clone()),
            ),
            created: Some(Utc::now()),
            usage,
        }
    }
}

/// Whitespace-delimited word count, standing in for a tokenizer.
fn count_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

fn usage_for(request: &ChatRequest, reply: &str) -> Usage {
    let prompt_tokens = request
        .messages()
        .iter()
        .map(|m| count_tokens(&m.content))
        .sum::<u32>();
    let completion_tokens = count_tokens(reply);
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

/// Split `text` into word pieces that concatenate back to `text`.
fn split_words(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl ChatModel for LocalChatModel {
    async fn call(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let reply = Self::reply_for(&request);
        let usage = usage_for(&request, &reply);
        Ok(ChatResponse::new(
            Some(Generation {
                content: reply,
                finish_reason: Some("stop".to_string()),
            }),
            self.metadata(&request, Some(usage)),
        ))
    }

    fn stream(&self, request: ChatRequest) -> ChatStream {
        let reply = Self::reply_for(&request);
        let usage = usage_for(&request, &reply);
        let pieces = split_words(&reply);
        let last = pieces.len().saturating_sub(1);

        let chunks: Vec<Result<ChatResponse, ChatError>> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let done = i == last;
                Ok(ChatResponse::new(
                    Some(Generation {
                        content: piece,
                        finish_reason: done.then(|| "stop".to_string()),
                    }),
                    self.metadata(&request, done.then_some(usage)),
                ))
            })
            .collect();

        stream::iter(chunks).boxed()
    }
}
