//! Advisor chain around chat model calls.
//!
//! Advisors form an ordered chain terminating at a [`ChatModel`]. Each
//! advisor receives the request together with a handle to the rest of the
//! chain ([`CallNext`] or [`StreamNext`]) and decides what happens before and
//! after delegating. Lower `order` runs first on the way in and last on the
//! way out (onion model).

pub mod logging;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::debug;

use crate::chat::{ChatError, ChatRequest, ChatResponse};
use crate::model::{ChatModel, ChatStream};

pub use logging::LoggingAdvisor;

/// Advisor trait — implement to wrap model calls.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Wrap a blocking call. Call `next.call(request)` to continue the chain.
    async fn advise_call(
        &self,
        request: ChatRequest,
        next: CallNext<'_>,
    ) -> Result<ChatResponse, ChatError>;

    /// Wrap a streamed call. Call `next.stream(request)` to continue the chain.
    fn advise_stream(&self, request: ChatRequest, next: StreamNext) -> ChatStream;

    /// Advisor identifier for debugging/logging.
    fn name(&self) -> &str;

    /// Position in the chain; lower runs first.
    fn order(&self) -> i32 {
        0
    }
}

/// Remainder of the chain for a blocking call.
#[derive(Clone, Copy)]
pub struct CallNext<'a> {
    advisors: &'a [Arc<dyn Advisor>],
    model: &'a dyn ChatModel,
}

impl<'a> CallNext<'a> {
    /// Hand the request to the next advisor, or to the model when none remain.
    pub fn call(self, request: ChatRequest) -> BoxFuture<'a, Result<ChatResponse, ChatError>> {
        match self.advisors.split_first() {
            Some((head, rest)) => head.advise_call(
                request,
                CallNext {
                    advisors: rest,
                    model: self.model,
                },
            ),
            None => self.model.call(request),
        }
    }
}

/// Remainder of the chain for a streamed call.
///
/// Owns its chain so the streams it produces are `'static`.
#[derive(Clone)]
pub struct StreamNext {
    advisors: Arc<[Arc<dyn Advisor>]>,
    position: usize,
    model: Arc<dyn ChatModel>,
}

impl StreamNext {
    /// Hand the request to the next advisor, or to the model when none remain.
    pub fn stream(self, request: ChatRequest) -> ChatStream {
        match self.advisors.get(self.position).cloned() {
            Some(head) => head.advise_stream(
                request,
                StreamNext {
                    position: self.position + 1,
                    ..self
                },
            ),
            None => self.model.stream(request),
        }
    }
}

/// Ordered advisors plus the terminal model.
#[derive(Clone)]
pub struct AdvisorChain {
    advisors: Arc<[Arc<dyn Advisor>]>,
    model: Arc<dyn ChatModel>,
}

impl AdvisorChain {
    /// Build a chain; advisors are sorted by `order`, ties keep their
    /// registration order.
    pub fn new(model: Arc<dyn ChatModel>, mut advisors: Vec<Arc<dyn Advisor>>) -> Self {
        advisors.sort_by_key(|a| a.order());
        debug!(
            advisors = ?advisors.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "advisor chain built"
        );
        Self {
            advisors: advisors.into(),
            model,
        }
    }

    /// Chain with no advisors; calls go straight to the model.
    pub fn empty(model: Arc<dyn ChatModel>) -> Self {
        Self::new(model, Vec::new())
    }

    /// Run a blocking call through every advisor.
    pub async fn call(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        CallNext {
            advisors: &self.advisors,
            model: self.model.as_ref(),
        }
        .call(request)
        .await
    }

    /// Run a streamed call through every advisor.
    pub fn stream(&self, request: ChatRequest) -> ChatStream {
        StreamNext {
            advisors: self.advisors.clone(),
            position: 0,
            model: self.model.clone(),
        }
        .stream(request)
    }

    /// Advisor names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.advisors.iter().map(|a| a.name()).collect()
    }
}

impl fmt::Debug for AdvisorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorChain")
            .field("advisors", &self.names())
            .finish_non_exhaustive()
    }
}
