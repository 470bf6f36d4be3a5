//! OpenAI-compatible chat provider.
//!
//! Calls `{base_url}/chat/completions`. The streaming path sends
//! `"stream": true` and parses the `text/event-stream` body, stopping at the
//! `[DONE]` sentinel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt, future, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::ModelConfig;
use super::{ChatModel, ChatStream};
use crate::chat::{
    ChatError, ChatOptions, ChatRequest, ChatResponse, Generation, Message, ResponseMetadata,
    Usage,
};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct Completion {
    id: Option<String>,
    model: Option<String>,
    created: Option<i64>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    /// Present on full completions.
    message: Option<WireMessage>,
    /// Present on stream chunks.
    delta: Option<WireMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(u: WireUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

impl Completion {
    fn into_response(self) -> ChatResponse {
        let result = self.choices.into_iter().next().map(|choice| {
            let content = choice
                .message
                .or(choice.delta)
                .and_then(|m| m.content)
                .unwrap_or_default();
            Generation {
                content,
                finish_reason: choice.finish_reason,
            }
        });
        ChatResponse::new(
            result,
            ResponseMetadata {
                id: self.id,
                model: self.model,
                created: self.created.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
                usage: self.usage.map(Usage::from),
            },
        )
    }
}

/// Chat model backed by an OpenAI-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    api_key: String,
    defaults: ChatOptions,
}

impl OpenAiChatModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ChatError> {
        Self::with_client(Client::new(), config)
    }

    /// Create a model with a custom reqwest client.
    pub fn with_client(client: Client, config: &ModelConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ChatError::Config("OPENAI_API_KEY is required for openai provider".to_string())
        })?;
        Ok(Self {
            client,
            endpoint: completions_url(&config.base_url),
            api_key,
            defaults: config.default_options(),
        })
    }

    fn body(&self, request: &ChatRequest, stream: bool) -> Result<serde_json::Value, ChatError> {
        let options = self.defaults.merge(request.options());
        let model = options
            .model
            .as_deref()
            .ok_or_else(|| ChatError::Config("No model configured".to_string()))?;
        let body = CompletionRequest {
            model,
            messages: request.messages(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        };
        Ok(serde_json::to_value(&body)?)
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// POST the body and fail on non-2xx statuses.
async fn send(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<reqwest::Response, ChatError> {
    let resp = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ChatError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// One decoded SSE event.
#[derive(Debug)]
enum StreamEvent {
    Chunk(ChatResponse),
    /// Comment, keep-alive or empty data.
    Skip,
    /// The `[DONE]` sentinel; nothing after it is read.
    Done,
}

fn parse_stream_event(sse: &sse_stream::Sse) -> Result<StreamEvent, ChatError> {
    let Some(data) = sse.data.as_deref().map(str::trim) else {
        return Ok(StreamEvent::Skip);
    };
    if data == DONE_SENTINEL {
        return Ok(StreamEvent::Done);
    }
    if data.is_empty() {
        return Ok(StreamEvent::Skip);
    }
    let completion: Completion = serde_json::from_str(data)?;
    Ok(StreamEvent::Chunk(completion.into_response()))
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn call(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let body = self.body(&request, false)?;
        debug!(request_id = %request.id(), endpoint = %self.endpoint, "sending chat completion");
        let resp = send(&self.client, &self.endpoint, &self.api_key, &body).await?;
        let completion: Completion = resp.json().await?;
        Ok(completion.into_response())
    }

    fn stream(&self, request: ChatRequest) -> ChatStream {
        let body = match self.body(&request, true) {
            Ok(body) => body,
            Err(e) => return stream::once(future::ready(Err(e))).boxed(),
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let request_id = request.id();

        let events = async move {
            debug!(request_id = %request_id, endpoint = %endpoint, "opening chat completion stream");
            let resp = send(&client, &endpoint, &api_key, &body).await?;
            let events = sse_stream::SseStream::from_byte_stream(resp.bytes_stream())
                .map_err(|e| ChatError::Stream(e.to_string()))
                .and_then(|sse| future::ready(parse_stream_event(&sse)))
                .try_take_while(|event| {
                    future::ready(Ok::<_, ChatError>(!matches!(event, StreamEvent::Done)))
                })
                .try_filter_map(|event| {
                    future::ready(Ok::<_, ChatError>(match event {
                        StreamEvent::Chunk(chunk) => Some(chunk),
                        StreamEvent::Skip | StreamEvent::Done => None,
                    }))
                });
            Ok::<_, ChatError>(events)
        };

        stream::once(events).try_flatten().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse(data: Option<&str>) -> sse_stream::Sse {
        sse_stream::Sse {
            event: None,
            data: data.map(str::to_string),
            id: None,
            retry: None,
        }
    }

    fn config() -> ModelConfig {
        ModelConfig {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn completions_url_joins_base() {
        assert_eq!(
            completions_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8080/v1"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn body_merges_request_options_over_defaults() {
        let model = OpenAiChatModel::new(&ModelConfig {
            temperature: Some(0.1),
            ..config()
        })
        .unwrap();
        let request = ChatRequest::new(
            vec![Message::user("hi")],
            ChatOptions {
                model: Some("gpt-4o".into()),
                temperature: None,
                max_tokens: Some(32),
            },
        );

        let body = model.body(&request, false).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["stream"], false);
        assert!(body.get("stream_options").is_none());
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn stream_body_requests_usage() {
        let model = OpenAiChatModel::new(&config()).unwrap();
        let body = model.body(&ChatRequest::user("hi"), true).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn decodes_full_completion() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A unicorn walks into a bar."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        }"#;
        let completion: Completion = serde_json::from_str(json).unwrap();
        let resp = completion.into_response();

        assert_eq!(resp.content(), Some("A unicorn walks into a bar."));
        assert_eq!(resp.finish_reason(), Some("stop"));
        assert_eq!(resp.metadata.id.as_deref(), Some("chatcmpl-123"));
        assert_eq!(resp.metadata.created.map(|c| c.timestamp()), Some(1_700_000_000));
        assert_eq!(resp.metadata.usage.map(|u| u.total_tokens), Some(19));
    }

    #[test]
    fn parses_delta_chunk() {
        let event = sse(Some(
            r#"{"id":"c1","model":"gpt-4o-mini","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        ));
        let StreamEvent::Chunk(chunk) = parse_stream_event(&event).unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.content(), Some("Hel"));
        assert_eq!(chunk.finish_reason(), None);
    }

    #[test]
    fn usage_chunk_has_no_result() {
        let event = sse(Some(
            r#"{"id":"c1","choices":[],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#,
        ));
        let StreamEvent::Chunk(chunk) = parse_stream_event(&event).unwrap() else {
            panic!("expected a chunk");
        };
        assert!(chunk.result.is_none());
        assert_eq!(chunk.metadata.usage.map(|u| u.completion_tokens), Some(2));
    }

    #[test]
    fn done_sentinel_ends_and_empty_events_are_skipped() {
        assert!(matches!(
            parse_stream_event(&sse(Some(" [DONE] "))),
            Ok(StreamEvent::Done)
        ));
        assert!(matches!(parse_stream_event(&sse(Some("  "))), Ok(StreamEvent::Skip)));
        assert!(matches!(parse_stream_event(&sse(None)), Ok(StreamEvent::Skip)));
    }

    #[test]
    fn malformed_chunk_is_decode_error() {
        let err = parse_stream_event(&sse(Some("not json"))).unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }
}
