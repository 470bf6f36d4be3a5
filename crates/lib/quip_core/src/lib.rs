//! # quip_core
//!
//! Chat data model, model providers and the advisor chain for Quip.
//!
//! Every model call made through a [`ChatClient`] passes through an ordered
//! [`advisor::AdvisorChain`]. [`LoggingAdvisor`] logs each request before
//! delegating and each response after the call (or, for streams, after the
//! last chunk) completes.

pub mod advisor;
pub mod chat;
pub mod client;
pub mod model;

pub use advisor::{Advisor, AdvisorChain, LoggingAdvisor};
pub use chat::{ChatError, ChatOptions, ChatRequest, ChatResponse, Message};
pub use client::{ChatClient, DEFAULT_PROMPT};
pub use model::{ChatModel, ChatStream, ModelConfig, build_model};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
