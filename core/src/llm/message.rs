//! Message types for AI language model conversations.
//!
//! Messages are represented as an enum with variants for different roles (User, Assistant,
//! System, Tool). User and tool messages may carry [`Image`] parts next to their text.

use serde::{Deserialize, Serialize};
use url::Url;

use super::completion::ToolCall;

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User message - input from human user.
    User,
    /// AI assistant message - responses from the AI.
    Assistant,
    /// System message - context/instructions for the AI.
    System,
    /// Tool message - output from tool/function calls.
    Tool,
}

/// An image part attached to a user or tool message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Image {
    /// Image hosted at a URL the backend can fetch.
    Url {
        /// Location of the image.
        url: Url,
    },
    /// Base64-encoded image payload.
    Inline {
        /// MIME type such as `image/png`.
        media_type: String,
        /// Base64 payload.
        data: String,
    },
}

impl Image {
    /// Creates an image part pointing at `url`.
    #[must_use]
    pub const fn url(url: Url) -> Self {
        Self::Url { url }
    }

    /// Creates an inline base64 image part.
    pub fn inline(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Inline {
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// A message in a conversation.
///
/// Different message types have different fields:
/// - User: content with optional images
/// - Assistant: content with optional tool calls
/// - System: content only
/// - Tool: content and optional images, tied to the originating tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// User message with content and optional images.
    User {
        /// Text content of the message.
        content: String,
        /// Image parts sent alongside the text.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        images: Vec<Image>,
    },
    /// Assistant message with content and optional tool calls.
    Assistant {
        /// Text content of the message.
        content: String,
        /// Tool calls made by the assistant.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// System message with instructions/context.
    System {
        /// Text content of the message.
        content: String,
    },
    /// Tool result message.
    Tool {
        /// ID of the tool call this is responding to.
        tool_call_id: String,
        /// Name of the tool that produced the result.
        tool_name: String,
        /// Result content from the tool.
        content: String,
        /// Image parts returned by the tool.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        images: Vec<Image>,
    },
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Creates an assistant message without tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Creates a text-only tool result message.
    pub fn tool(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Attaches an image. Ignored for assistant and system messages.
    #[must_use]
    pub fn with_image(mut self, image: Image) -> Self {
        if let Self::User { images, .. } | Self::Tool { images, .. } = &mut self {
            images.push(image);
        }
        self
    }

    /// Attaches tool calls. Ignored for anything but assistant messages.
    #[must_use]
    pub fn with_tool_calls(mut self, calls: impl IntoIterator<Item = ToolCall>) -> Self {
        if let Self::Assistant { tool_calls, .. } = &mut self {
            tool_calls.extend(calls);
        }
        self
    }

    /// Returns the message sender role.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::System { .. } => Role::System,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Returns the text content of the message.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::User { content, .. }
            | Self::Assistant { content, .. }
            | Self::System { content }
            | Self::Tool { content, .. } => content,
        }
    }

    /// Returns the image parts (user and tool messages only).
    #[must_use]
    pub fn images(&self) -> &[Image] {
        match self {
            Self::User { images, .. } | Self::Tool { images, .. } => images,
            _ => &[],
        }
    }

    /// Returns `true` if the message carries at least one image part.
    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.images().is_empty()
    }

    /// Returns tool calls made by the assistant (only for Assistant messages).
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Returns the tool call ID (only for Tool messages).
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Returns the tool name (only for Tool messages).
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::Tool { tool_name, .. } => Some(tool_name),
            _ => None,
        }
    }

    /// Length of the textual payload in characters.
    ///
    /// Counts the content plus the serialized arguments of any tool calls. Image parts
    /// contribute nothing.
    #[must_use]
    pub fn text_len(&self) -> usize {
        let calls: usize = self
            .tool_calls()
            .iter()
            .map(|call| call.name.chars().count() + call.arguments_json().chars().count())
            .sum();
        self.content().chars().count() + calls
    }
}
