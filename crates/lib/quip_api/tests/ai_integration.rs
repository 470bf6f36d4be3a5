//! Integration test — build the router over a local model, call /ai, assert
//! on the body and on the advisor's log lines.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures_util::{StreamExt, stream};
use quip_api::{AppState, handlers::ai::DEFAULT_PROMPT};
use quip_core::model::LocalChatModel;
use quip_core::{
    ChatClient, ChatError, ChatModel, ChatRequest, ChatResponse, ChatStream, LoggingAdvisor,
};
use tower::ServiceExt;

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

fn app_with(model: Arc<dyn ChatModel>) -> axum::Router {
    let client = ChatClient::builder(model)
        .default_advisor(LoggingAdvisor::new())
        .build();
    quip_api::router(AppState { client })
}

fn local_app() -> axum::Router {
    app_with(Arc::new(LocalChatModel::new("echo-1")))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.expect("request");

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, content_type, String::from_utf8(body.to_vec()).expect("utf-8 body"))
}

#[tokio::test]
async fn missing_prompt_uses_default() {
    let (status, content_type, body) = get(local_app(), "/ai").await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        content_type.as_deref().is_some_and(|ct| ct.starts_with("text/plain")),
        "unexpected content type: {content_type:?}"
    );
    assert_eq!(body, format!("echo: {DEFAULT_PROMPT}"));
}

#[tokio::test]
async fn prompt_is_passed_through() {
    let (status, _, body) = get(local_app(), "/ai?prompt=why%20is%20rent%20so%20high").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "echo: why is rent so high");
}

#[tokio::test]
async fn empty_prompt_is_not_replaced() {
    let (status, _, body) = get(local_app(), "/ai?prompt=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "echo: ");
}

#[tokio::test]
async fn each_request_logs_request_then_response() {
    let (logs, _guard) = capture_logs();

    let (status, _, _) = get(local_app(), "/ai?prompt=knock%20knock").await;
    assert_eq!(status, StatusCode::OK);

    let out = logs.contents();
    let info: Vec<&str> = out.lines().filter(|l| l.contains("INFO")).collect();
    assert_eq!(info.len(), 2, "expected two INFO lines, got:\n{out}");
    assert!(info[0].contains("request: "), "first line: {}", info[0]);
    assert!(info[0].contains("knock knock"));
    assert!(info[1].contains("response: "), "second line: {}", info[1]);

    let response_at = out.find("response: ").unwrap();
    assert!(out[response_at..].contains("echo: knock knock"));
}

/// Model that always fails the way a provider would.
struct FailingModel(fn() -> ChatError);

#[async_trait]
impl ChatModel for FailingModel {
    async fn call(&self, _request: ChatRequest) -> Result<ChatResponse, ChatError> {
        Err((self.0)())
    }

    fn stream(&self, _request: ChatRequest) -> ChatStream {
        stream::once(async { Err(ChatError::Stream("unused".into())) }).boxed()
    }
}

#[tokio::test]
async fn provider_failure_maps_to_bad_gateway_without_response_log() {
    let (logs, _guard) = capture_logs();
    let app = app_with(Arc::new(FailingModel(|| ChatError::Provider {
        status: 503,
        body: "overloaded".into(),
    })));

    let (status, _, body) = get(app, "/ai").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = serde_json::from_str(&body).expect("parse JSON");
    assert_eq!(json["error"], "upstream_error");
    assert!(json["message"].as_str().unwrap().contains("overloaded"));

    let out = logs.contents();
    assert!(out.contains("request: "));
    assert!(!out.contains("response: "), "no response line on failure:\n{out}");
}

#[tokio::test]
async fn config_failure_maps_to_internal_error() {
    let app = app_with(Arc::new(FailingModel(|| {
        ChatError::Config("No model configured".into())
    })));

    let (status, _, body) = get(app, "/ai").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body).expect("parse JSON");
    assert_eq!(json["error"], "internal_error");
    assert_eq!(json["message"], "Internal server error");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _, _) = get(local_app(), "/api/hello").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Echo model that counts how often each path is taken.
#[derive(Default)]
struct CountingModel {
    calls: AtomicUsize,
    streams: AtomicUsize,
    prompts: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl ChatModel for CountingModel {
    async fn call(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(request.last_user_text().map(str::to_string));
        LocalChatModel::new("echo-1").call(request).await
    }

    fn stream(&self, request: ChatRequest) -> ChatStream {
        self.streams.fetch_add(1, Ordering::SeqCst);
        LocalChatModel::new("echo-1").stream(request)
    }
}

#[tokio::test]
async fn each_get_issues_exactly_one_model_call() {
    let model = Arc::new(CountingModel::default());
    let app = app_with(model.clone());

    let (status, _, body) = get(app.clone(), "/ai?prompt=one").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "echo: one");
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let (status, _, _) = get(app, "/ai").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    assert_eq!(model.streams.load(Ordering::SeqCst), 0);

    assert_eq!(
        *model.prompts.lock().unwrap(),
        vec![Some("one".to_string()), Some(DEFAULT_PROMPT.to_string())]
    );
}
