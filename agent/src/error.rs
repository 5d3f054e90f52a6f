//! Agent error types.

use hyperfocus_blobs::BlobError;
use thiserror::Error;

use crate::router::Backend;

/// Errors that can occur during agent execution.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// A backend call failed or timed out.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        /// Backend that was asked to answer.
        backend: Backend,
        /// Failure or timeout description.
        reason: String,
    },

    /// A paged task failed as a whole.
    #[error("task failed: {0}")]
    Task(#[from] TaskError),

    /// Maximum iterations exceeded without completing the task.
    #[error("exceeded maximum iterations ({limit})")]
    MaxIterations {
        /// The iteration limit that was exceeded.
        limit: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Returns `true` if this is a backend-level failure worth retrying
    /// (e.g. after a pause, or against another backend).
    ///
    /// The agent itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::Task(TaskError::Backend { .. })
        )
    }
}

/// Errors raised by the task executor.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The blob to process could not be read.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The blob holds nothing to process.
    #[error("stored data `{id}` has no content to process")]
    EmptyContent {
        /// Identifier of the empty blob.
        id: String,
    },

    /// Every page failed, so there is nothing to aggregate.
    #[error("all {pages} pages failed; last error: {last_error}")]
    AllPagesFailed {
        /// Number of pages attempted.
        pages: usize,
        /// Failure reason of the final page.
        last_error: String,
    },

    /// The summarizing call failed.
    #[error("summarizing page results failed on the {backend} backend: {reason}")]
    Backend {
        /// Backend that was asked to summarize.
        backend: Backend,
        /// Failure or timeout description.
        reason: String,
    },
}

impl TaskError {
    /// Returns `true` if the task produced no result at all.
    ///
    /// Such failures end [`Agent::query`](crate::Agent::query) instead of being shown
    /// to the model as a tool result.
    #[must_use]
    pub const fn is_total_failure(&self) -> bool {
        matches!(self, Self::AllPagesFailed { .. } | Self::Backend { .. })
    }
}

/// Failures of a semantic segmentation provider.
///
/// Never surfaced to callers of the chunker: any of these triggers line-based splitting.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Provider is not configured (e.g. no API key).
    #[error("segmentation provider unavailable: {0}")]
    Unavailable(String),

    /// Transport or HTTP-level failure.
    #[error("segmentation request failed: {0}")]
    Request(String),

    /// Provider answered with no segments.
    #[error("segmentation provider returned no segments")]
    Empty,

    /// Provider segments do not cover the original text.
    #[error("segments do not preserve the original content")]
    ContentMismatch,

    /// Input exceeds what the provider accepts.
    #[error("input of {len} characters exceeds the provider limit of {limit}")]
    TooLarge {
        /// Input length in characters.
        len: usize,
        /// Provider limit in characters.
        limit: usize,
    },
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
