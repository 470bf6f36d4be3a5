//! # quip_api
//!
//! HTTP API library for Quip.

pub mod config;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use quip_core::ChatClient;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::ai;

/// Route for the prompt endpoint.
pub const AI_ROUTE: &str = "/ai";

/// Shared application state passed to all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Chat client with the logging advisor installed.
    pub client: ChatClient,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(AI_ROUTE, get(ai::generate))
        .layer(cors)
        .with_state(state)
}
