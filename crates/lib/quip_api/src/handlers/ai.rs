//! Prompt endpoint — send a single user message through the chat client.

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::debug;

use crate::AppState;
use crate::error::AppResult;

pub use quip_core::DEFAULT_PROMPT;

#[derive(Debug, Default, Deserialize)]
pub struct AiQuery {
    pub prompt: Option<String>,
}

/// `GET /ai?prompt=…` — returns the generated text as `text/plain`.
///
/// An absent prompt falls back to [`DEFAULT_PROMPT`]; an empty one is sent
/// as-is.
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<AiQuery>,
) -> AppResult<String> {
    let prompt = query.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    debug!(prompt_len = prompt.len(), "generate");

    let text = state.client.prompt().user(prompt).content().await?;
    Ok(text)
}
