//! Chat client — the entry point callers use to talk to a model.
//!
//! ```ignore
//! let client = ChatClient::builder(model)
//!     .default_advisor(LoggingAdvisor::new())
//!     .build();
//! let text = client.prompt().user("Tell me a joke").content().await?;
//! ```

use std::sync::Arc;

use crate::advisor::{Advisor, AdvisorChain};
use crate::chat::{ChatError, ChatOptions, ChatRequest, ChatResponse, Message};
use crate::model::{ChatModel, ChatStream};

/// Prompt used by front ends when the caller supplies none.
pub const DEFAULT_PROMPT: &str = "Tell me a joke about startups in the bay area";

/// Model plus default advisors and options. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ChatClient {
    chain: AdvisorChain,
    defaults: ChatOptions,
}

impl ChatClient {
    pub fn builder(model: Arc<dyn ChatModel>) -> ChatClientBuilder {
        ChatClientBuilder {
            model,
            advisors: Vec::new(),
            defaults: ChatOptions::default(),
        }
    }

    /// Start describing one request.
    pub fn prompt(&self) -> PromptSpec<'_> {
        PromptSpec {
            client: self,
            system: None,
            user: None,
            options: ChatOptions::default(),
        }
    }

    /// Advisor names in execution order.
    pub fn advisor_names(&self) -> Vec<&str> {
        self.chain.names()
    }
}

pub struct ChatClientBuilder {
    model: Arc<dyn ChatModel>,
    advisors: Vec<Arc<dyn Advisor>>,
    defaults: ChatOptions,
}

impl ChatClientBuilder {
    pub fn default_advisor(mut self, advisor: impl Advisor + 'static) -> Self {
        self.advisors.push(Arc::new(advisor));
        self
    }

    pub fn default_advisors(
        mut self,
        advisors: impl IntoIterator<Item = Arc<dyn Advisor>>,
    ) -> Self {
        self.advisors.extend(advisors);
        self
    }

    pub fn default_options(mut self, options: ChatOptions) -> Self {
        self.defaults = options;
        self
    }

    pub fn build(self) -> ChatClient {
        ChatClient {
            chain: AdvisorChain::new(self.model, self.advisors),
            defaults: self.defaults,
        }
    }
}

/// One request under construction.
pub struct PromptSpec<'a> {
    client: &'a ChatClient,
    system: Option<String>,
    user: Option<String>,
    options: ChatOptions,
}

impl<'a> PromptSpec<'a> {
    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.system = Some(text.into());
        self
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.user = Some(text.into());
        self
    }

    /// Per-request options; set fields override the client defaults.
    pub fn options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    fn into_request(self) -> (ChatRequest, &'a ChatClient) {
        let messages = self
            .system
            .map(Message::system)
            .into_iter()
            .chain(self.user.map(Message::user))
            .collect();
        let options = self.client.defaults.merge(&self.options);
        (ChatRequest::new(messages, options), self.client)
    }

    /// Run the request through the advisor chain and wait for the result.
    pub async fn call(self) -> Result<ChatResponse, ChatError> {
        let (request, client) = self.into_request();
        client.chain.call(request).await
    }

    /// Run the request and return only the generated text (empty when the
    /// provider returned no result).
    pub async fn content(self) -> Result<String, ChatError> {
        let response = self.call().await?;
        Ok(response.content().unwrap_or_default().to_string())
    }

    /// Run the request as a stream of chunks.
    pub fn stream(self) -> ChatStream {
        let (request, client) = self.into_request();
        client.chain.stream(request)
    }
}
