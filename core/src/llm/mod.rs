//! # Language Models and Conversation Messages
//!
//! - **[`LanguageModel`]** - The trait every backend implements
//! - **[`LLMRequest`]** - Messages plus the tool definitions offered to the model
//! - **[`Completion`]** - A finished model reply, possibly requesting tool calls
//! - **[`Message`]** - A single entry in a conversation
//! - **[`Tool`]** - Function calling interface for extending model capabilities
//!
//! ## Quick Start
//!
//! ```rust
//! use hyperfocus_core::llm::{LanguageModel, oneshot};
//!
//! async fn ask(model: impl LanguageModel) -> Result<String, Box<dyn std::error::Error>> {
//!     let request = oneshot("You are a helpful assistant", "What's the capital of Japan?");
//!     let completion = model.respond(request).await?;
//!     Ok(completion.content)
//! }
//! ```

mod completion;
/// Message types and conversation handling.
pub mod message;
/// Tool system for function calling.
pub mod tool;

use std::{future::Future, sync::Arc};

pub use completion::{Completion, ToolCall};
pub use message::{Image, Message, Role};
pub use tool::Tool;

use crate::llm::tool::ToolDefinition;

/// Request passed into [`LanguageModel::respond`].
///
/// Owns the conversation and the tool definitions the model may call. Each request is
/// self-contained: backends keep no conversation state between calls.
#[derive(Debug, Clone, Default)]
pub struct LLMRequest {
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
}

impl LLMRequest {
    /// Creates a request from the provided messages with no tools attached.
    pub fn new(messages: impl Into<Vec<Message>>) -> Self {
        Self {
            messages: messages.into(),
            tools: Vec::new(),
        }
    }

    /// Offers the given tool definitions to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Returns the conversation messages.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the tool definitions offered to the model.
    #[must_use]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Breaks the request into owned components.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Message>, Vec<ToolDefinition>) {
        (self.messages, self.tools)
    }
}

/// Language model backends.
///
/// A backend receives a full message list and answers with a [`Completion`]. Whether it is
/// a hosted API, a local model or a scripted test double is irrelevant to the callers.
pub trait LanguageModel: Send + Sync {
    /// The error type returned by this language model.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produces a completion for the conversation in `request`.
    fn respond(
        &self,
        request: LLMRequest,
    ) -> impl Future<Output = Result<Completion, Self::Error>> + Send;
}

macro_rules! impl_language_model {
    ($($name:ident),*) => {
        $(
            impl<T: LanguageModel> LanguageModel for $name<T> {
                type Error = T::Error;

                fn respond(
                    &self,
                    request: LLMRequest,
                ) -> impl Future<Output = Result<Completion, Self::Error>> + Send {
                    T::respond(self, request)
                }
            }
        )*
    };
}

impl<T: LanguageModel> LanguageModel for &T {
    type Error = T::Error;

    fn respond(
        &self,
        request: LLMRequest,
    ) -> impl Future<Output = Result<Completion, Self::Error>> + Send {
        T::respond(self, request)
    }
}

impl_language_model!(Arc, Box);

/// Creates a request with a system prompt and a single user message.
pub fn oneshot(system: impl Into<String>, user: impl Into<String>) -> LLMRequest {
    LLMRequest::new([Message::system(system), Message::user(user)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    struct Echo;

    impl LanguageModel for Echo {
        type Error = Infallible;

        async fn respond(&self, request: LLMRequest) -> Result<Completion, Self::Error> {
            let last = request
                .messages()
                .last()
                .map(|message| message.content().to_owned())
                .unwrap_or_default();
            Ok(Completion::text(last))
        }
    }

    #[test]
    fn oneshot_builds_system_and_user() {
        let request = oneshot("be terse", "hello");
        assert_eq!(request.messages().len(), 2);
        assert_eq!(request.messages()[0].role(), Role::System);
        assert_eq!(request.messages()[1].content(), "hello");
        assert!(request.tools().is_empty());
    }

    #[test]
    fn wrappers_forward_to_inner_model() {
        let shared = Arc::new(Echo);
        let completion = tokio_test::block_on(shared.respond(oneshot("s", "ping"))).unwrap();
        assert_eq!(completion.content, "ping");

        let boxed = Box::new(Echo);
        let completion = tokio_test::block_on((&boxed).respond(oneshot("s", "pong"))).unwrap();
        assert_eq!(completion.content, "pong");
    }
}
