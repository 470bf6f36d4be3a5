//! Logging advisor — logs every request before the model call and every
//! response after it.
//!
//! Streamed calls are logged once, with the chunks re-aggregated, after the
//! stream has been fully drained. An abandoned or failed stream produces no
//! response line.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{Advisor, CallNext, StreamNext};
use crate::chat::aggregate::aggregate_stream;
use crate::chat::{ChatError, ChatRequest, ChatResponse, Generation, ResponseMetadata};
use crate::model::ChatStream;

/// Renders a request for the `request:` log line.
pub type RequestFormatter = Arc<dyn Fn(&ChatRequest) -> String + Send + Sync>;

/// Renders a response for the `response:` log line.
pub type ResponseFormatter = Arc<dyn Fn(&ChatResponse) -> String + Send + Sync>;

/// Default request rendering: the request's `Debug` form.
pub fn default_request_formatter() -> RequestFormatter {
    Arc::new(|request: &ChatRequest| format!("{request:?}"))
}

/// Default response rendering: pretty JSON with `result` and `metadata`.
pub fn default_response_formatter() -> ResponseFormatter {
    Arc::new(response_to_json)
}

#[derive(Serialize)]
struct ResponsePayload<'a> {
    result: &'a Option<Generation>,
    metadata: &'a ResponseMetadata,
}

/// Pretty JSON of `{ "result": …, "metadata": … }`.
pub fn response_to_json(response: &ChatResponse) -> String {
    let payload = ResponsePayload {
        result: &response.result,
        metadata: &response.metadata,
    };
    serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|e| format!("<unserializable response: {e}>"))
}

/// Formatters run unconditionally; the level filter only gates the emit.
fn log_response(formatter: &ResponseFormatter, request_id: Uuid, response: &ChatResponse) {
    let formatted = formatter(response);
    info!(%request_id, "response: {formatted}");
}

/// Logs requests and responses at `INFO`. Never alters either.
#[derive(Clone)]
pub struct LoggingAdvisor {
    request_formatter: RequestFormatter,
    response_formatter: ResponseFormatter,
    order: i32,
}

impl LoggingAdvisor {
    pub const NAME: &'static str = "LoggingAdvisor";

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_order(order: i32) -> Self {
        Self::builder().order(order).build()
    }

    pub fn builder() -> LoggingAdvisorBuilder {
        LoggingAdvisorBuilder::default()
    }

    fn log_request(&self, request: &ChatRequest) {
        let formatted = (self.request_formatter)(request);
        info!(request_id = %request.id(), "request: {formatted}");
    }
}

impl Default for LoggingAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggingAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(Self::NAME)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Advisor for LoggingAdvisor {
    async fn advise_call(
        &self,
        request: ChatRequest,
        next: CallNext<'_>,
    ) -> Result<ChatResponse, ChatError> {
        self.log_request(&request);
        let request_id = request.id();

        let response = next.call(request).await?;

        log_response(&self.response_formatter, request_id, &response);
        Ok(response)
    }

    fn advise_stream(&self, request: ChatRequest, next: StreamNext) -> ChatStream {
        self.log_request(&request);
        let request_id = request.id();
        let formatter = self.response_formatter.clone();

        let chunks = next.stream(request);
        aggregate_stream(chunks, move |aggregated| {
            log_response(&formatter, request_id, &aggregated)
        })
        .boxed()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn order(&self) -> i32 {
        self.order
    }
}

/// Builder for [`LoggingAdvisor`]. Unset formatters fall back to the defaults.
#[derive(Default)]
pub struct LoggingAdvisorBuilder {
    request_formatter: Option<RequestFormatter>,
    response_formatter: Option<ResponseFormatter>,
    order: i32,
}

impl LoggingAdvisorBuilder {
    pub fn request_formatter(
        mut self,
        f: impl Fn(&ChatRequest) -> String + Send + Sync + 'static,
    ) -> Self {
        self.request_formatter = Some(Arc::new(f));
        self
    }

    pub fn response_formatter(
        mut self,
        f: impl Fn(&ChatResponse) -> String + Send + Sync + 'static,
    ) -> Self {
        self.response_formatter = Some(Arc::new(f));
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn build(self) -> LoggingAdvisor {
        LoggingAdvisor {
            request_formatter: self
                .request_formatter
                .unwrap_or_else(default_request_formatter),
            response_formatter: self
                .response_formatter
                .unwrap_or_else(default_response_formatter),
            order: self.order,
        }
    }
}
