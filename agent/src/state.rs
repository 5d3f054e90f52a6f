//! Conversation state shared by every turn of an agent session.
//!
//! [`ConversationState`] owns three things: the ordered message log, the per-call
//! [`ResultMetadata`] that tells the compactor what may be stubbed, and the iteration
//! counter that dates every tool result.
//!
//! # Iteration bookkeeping
//!
//! The counter advances once per completed model call, *before* the tool calls that
//! call requested are executed. Tool results are therefore dated with the iteration in
//! which the model will first see them:
//!
//! ```text
//! iteration 0: model call ─▶ advance to 1 ─▶ tool result (created_at = 1)
//! iteration 1: compact (age 0, kept) ─▶ model sees full result ─▶ advance to 2
//! iteration 2: compact (age 1, stubbed if ephemeral)
//! ```

use hyperfocus_blobs::{BlobStore, ContentType, Metadata};
use hyperfocus_core::{Message, ToolOutput};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bookkeeping for one tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Whether the full result stays in context once it is no longer fresh.
    pub include_in_context: bool,
    /// Iteration in which the result was recorded.
    pub created_at_iteration: u64,
    /// Text that replaces the result once it is stubbed.
    pub stub_message: String,
    /// Size of the original result in characters.
    pub size: usize,
    /// Blob holding the full result, if it was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing_blob_id: Option<String>,
    /// Key under which a later result of the same tool replaces this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersession_key: Option<String>,
}

/// Default stub for results the producing tool marked as one-shot.
#[must_use]
pub fn default_stub(tool_name: &str) -> String {
    format!("[Result from {tool_name} excluded from context - processed in previous iteration]")
}

/// Stub for a result replaced by a newer result of the same tool and key.
#[must_use]
pub fn superseded_stub(tool_name: &str, key: &str) -> String {
    format!("[Result from {tool_name} for '{key}' superseded by a later call]")
}

fn oversize_stub(tool_name: &str, blob_id: &str, size: usize) -> String {
    format!(
        "[Result from {tool_name} was too large to show ({size} characters) and was stored as \
         '{blob_id}'. Use run_task with data_id='{blob_id}' to process it, or \
         stored_data_info to inspect it.]"
    )
}

/// The single mutable record of an agent session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    metadata: IndexMap<String, ResultMetadata>,
    current_iteration: u64,
}

impl ConversationState {
    /// Creates an empty state at iteration 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the log.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the message log.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replaces the whole message log, e.g. with a compacted copy.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Returns the metadata recorded for a tool call.
    #[must_use]
    pub fn metadata(&self, call_id: &str) -> Option<&ResultMetadata> {
        self.metadata.get(call_id)
    }

    /// Iterates over all recorded metadata in insertion order.
    pub fn all_metadata(&self) -> impl Iterator<Item = (&str, &ResultMetadata)> + '_ {
        self.metadata.iter().map(|(id, meta)| (id.as_str(), meta))
    }

    /// Current iteration number.
    #[must_use]
    pub const fn current_iteration(&self) -> u64 {
        self.current_iteration
    }

    /// Marks the end of a model call. Returns the new iteration number.
    pub const fn advance_iteration(&mut self) -> u64 {
        self.current_iteration += 1;
        self.current_iteration
    }

    /// Records a tool result: dates it, stores it when oversized and appends the message.
    ///
    /// Results longer than `oversize_threshold` characters are put into `store` (or, if
    /// the output already names a backing blob, that blob is reused) and the message
    /// shows a stub pointing at the blob from the start.
    ///
    /// Metadata is written once per call id. Recording the same id again appends the
    /// message but keeps the first metadata entry.
    pub fn record_tool_result(
        &mut self,
        store: &mut BlobStore,
        call_id: &str,
        tool_name: &str,
        output: ToolOutput,
        oversize_threshold: usize,
    ) -> ResultMetadata {
        let size = output.as_text().chars().count();
        let keep = output.keep_in_context();
        let custom_stub = output.stub().map(ToOwned::to_owned);
        let backing = output.backing_blob_id().map(ToOwned::to_owned);
        let supersession_key = output.supersession_key().map(ToOwned::to_owned);
        let (text, images) = output.into_parts();

        let (content, metadata) = if size > oversize_threshold {
            let blob_id = backing.unwrap_or_else(|| {
                store.put_from(tool_name, text, ContentType::Text, Metadata::new())
            });
            let stub = oversize_stub(tool_name, &blob_id, size);
            tracing::info!(call_id, tool = tool_name, size, blob = %blob_id, "oversized tool result stored");
            (
                stub.clone(),
                ResultMetadata {
                    include_in_context: false,
                    created_at_iteration: self.current_iteration,
                    stub_message: stub,
                    size,
                    backing_blob_id: Some(blob_id),
                    supersession_key,
                },
            )
        } else {
            (
                text,
                ResultMetadata {
                    include_in_context: keep,
                    created_at_iteration: self.current_iteration,
                    stub_message: custom_stub.unwrap_or_else(|| default_stub(tool_name)),
                    size,
                    backing_blob_id: backing,
                    supersession_key,
                },
            )
        };

        if self.metadata.contains_key(call_id) {
            tracing::warn!(call_id, "tool call id recorded twice; keeping first metadata");
        }
        let recorded = self
            .metadata
            .entry(call_id.to_owned())
            .or_insert(metadata)
            .clone();

        self.messages.push(Message::Tool {
            tool_call_id: call_id.to_owned(),
            tool_name: tool_name.to_owned(),
            content,
            images,
        });
        recorded
    }
}
