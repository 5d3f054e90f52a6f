//! # hyperfocus-core
//!
//! Shared vocabulary for the hyperfocus workspace: conversation [`Message`]s, the tool
//! boundary ([`Tool`], [`Tools`], [`ToolOutput`]), and the [`LanguageModel`] trait every
//! backend implements.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   Agent loop    │───▶│  hyperfocus-core │◀───│    Backends     │
//! │                 │    │                  │    │                 │
//! │ - compaction    │    │ - Message        │    │ - default       │
//! │ - routing       │    │ - Tool / Tools   │    │ - high-capacity │
//! │ - task paging   │    │ - LanguageModel  │    │ - multimodal    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use hyperfocus_core::{Tool, ToolOutput};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::borrow::Cow;
//!
//! #[derive(JsonSchema, Deserialize)]
//! struct EchoArgs {
//!     text: String,
//! }
//!
//! struct Echo;
//!
//! impl Tool for Echo {
//!     fn name(&self) -> Cow<'static, str> {
//!         "echo".into()
//!     }
//!     fn description(&self) -> Cow<'static, str> {
//!         "Repeats the given text".into()
//!     }
//!     type Arguments = EchoArgs;
//!
//!     async fn call(&mut self, args: Self::Arguments) -> hyperfocus_core::Result<ToolOutput> {
//!         Ok(ToolOutput::text(args.text))
//!     }
//! }
//! ```

pub mod llm;

#[doc(inline)]
pub use llm::{
    Completion, Image, LLMRequest, LanguageModel, Message, Role, ToolCall,
    tool::{Tool, ToolDefinition, ToolOutput, Tools},
};

/// Result type used throughout the crate.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
