//! Backend routing.
//!
//! Every model call goes to one of three backends. The choice is a pure function of
//! the message list about to be sent:
//!
//! 1. any image part in the history selects [`Backend::Multimodal`];
//! 2. otherwise a history longer than [`RouterConfig::history_threshold`] characters
//!    selects [`Backend::HighCapacity`];
//! 3. otherwise [`Backend::Default`] answers.

use std::fmt;
use std::time::Duration;

use futures_lite::future;
use hyperfocus_core::{Completion, LLMRequest, LanguageModel, Message};
use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;
use crate::error::AgentError;

/// A model-serving target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// The everyday backend.
    Default,
    /// Backend with a larger context window.
    HighCapacity,
    /// Backend able to read images.
    Multimodal,
}

impl Backend {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::HighCapacity => "high_capacity",
            Self::Multimodal => "multimodal",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a backend was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingReason {
    /// The history still carries image content.
    Images,
    /// The history is longer than the configured threshold.
    LongHistory,
    /// Nothing special about the history.
    Standard,
}

impl fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Images => "history contains images",
            Self::LongHistory => "history exceeds threshold",
            Self::Standard => "within default limits",
        })
    }
}

/// Result of [`route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Selected backend.
    pub backend: Backend,
    /// Rule that selected it.
    pub reason: RoutingReason,
    /// Total text length of the routed history in characters.
    pub history_len: usize,
}

/// Chooses the backend for `messages`.
///
/// Does not look at previous decisions and does not touch the messages.
#[must_use]
pub fn route(messages: &[Message], config: &RouterConfig) -> RoutingDecision {
    let history_len = messages.iter().map(Message::text_len).sum();
    let (backend, reason) = if messages.iter().any(Message::has_images) {
        (Backend::Multimodal, RoutingReason::Images)
    } else if history_len > config.history_threshold {
        (Backend::HighCapacity, RoutingReason::LongHistory)
    } else {
        (Backend::Default, RoutingReason::Standard)
    };

    tracing::info!(
        backend = %backend,
        reason = %reason,
        history_len,
        threshold = config.history_threshold,
        "routing decision"
    );

    RoutingDecision {
        backend,
        reason,
        history_len,
    }
}

/// The three backends an agent can route to.
///
/// Each role may be a different model type; [`Backends::uniform`] fills all roles
/// with one model.
#[derive(Debug, Clone)]
pub struct Backends<D, H = D, M = D> {
    /// Everyday backend.
    pub default: D,
    /// Large-context backend.
    pub high_capacity: H,
    /// Image-capable backend.
    pub multimodal: M,
}

impl<D: Clone> Backends<D, D, D> {
    /// Uses `model` for every role.
    pub fn uniform(model: D) -> Self {
        Self {
            default: model.clone(),
            high_capacity: model.clone(),
            multimodal: model,
        }
    }
}

impl<D, H, M> Backends<D, H, M>
where
    D: LanguageModel,
    H: LanguageModel,
    M: LanguageModel,
{
    /// Creates a backend set from three models.
    pub const fn new(default: D, high_capacity: H, multimodal: M) -> Self {
        Self {
            default,
            high_capacity,
            multimodal,
        }
    }

    /// Sends `request` to `backend`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::BackendUnavailable`] when the backend fails or does not
    /// answer in time. Nothing is retried.
    pub async fn complete(
        &self,
        backend: Backend,
        request: LLMRequest,
        timeout: Duration,
    ) -> Result<Completion, AgentError> {
        let call = async {
            let result = match backend {
                Backend::Default => self.default.respond(request).await.map_err(|e| e.to_string()),
                Backend::HighCapacity => self
                    .high_capacity
                    .respond(request)
                    .await
                    .map_err(|e| e.to_string()),
                Backend::Multimodal => self
                    .multimodal
                    .respond(request)
                    .await
                    .map_err(|e| e.to_string()),
            };
            Some(result)
        };
        let deadline = async {
            async_io::Timer::after(timeout).await;
            None
        };

        match future::or(call, deadline).await {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(reason)) => {
                tracing::warn!(backend = %backend, error = %reason, "backend call failed");
                Err(AgentError::BackendUnavailable { backend, reason })
            }
            None => {
                tracing::warn!(backend = %backend, ?timeout, "backend call timed out");
                Err(AgentError::BackendUnavailable {
                    backend,
                    reason: format!("timed out after {timeout:?}"),
                })
            }
        }
    }
}
