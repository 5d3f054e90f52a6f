//! # LLM Tool Calling Framework
//!
//! Type-safe tool calling for language models.
//!
//! - [`Tool`] - Trait for defining executable tools
//! - [`Tools`] - Registry for managing multiple tools
//! - [`ToolDefinition`] - Metadata and schema for LLM consumption
//! - [`ToolOutput`] - What a tool hands back, plus hints for the context manager
//!
//! ## Context hints
//!
//! A tool decides how long its output deserves to stay in the conversation. Output
//! marked with [`ToolOutput::ephemeral`] is shown to the model once and then replaced
//! by a short stub. Outputs carrying images are always ephemeral. Output marked with
//! [`ToolOutput::superseding`] is stubbed as soon as the same tool reports a newer
//! version under the same key.
//!
//! ```rust
//! use hyperfocus_core::{Tool, ToolOutput};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::borrow::Cow;
//!
//! #[derive(JsonSchema, Deserialize)]
//! struct FetchArgs {
//!     /// Page to download
//!     url: String,
//! }
//!
//! struct Fetch;
//!
//! impl Tool for Fetch {
//!     fn name(&self) -> Cow<'static, str> {
//!         "fetch".into()
//!     }
//!     fn description(&self) -> Cow<'static, str> {
//!         "Downloads a page".into()
//!     }
//!     type Arguments = FetchArgs;
//!
//!     async fn call(&mut self, args: Self::Arguments) -> hyperfocus_core::Result<ToolOutput> {
//!         let body = format!("<html>{}</html>", args.url);
//!         Ok(ToolOutput::text(body).ephemeral(format!("[page {} was shown earlier]", args.url)))
//!     }
//! }
//! ```

use std::{borrow::Cow, collections::BTreeMap, fmt::Debug, future::Future, pin::Pin};

use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::Image;
use crate::Result;

/// Tools that can be called by language models.
pub trait Tool: Send + Sync {
    /// Tool name. Must be unique.
    fn name(&self) -> Cow<'static, str>;
    /// Tool description for the language model.
    fn description(&self) -> Cow<'static, str>;

    /// Tool arguments type. Must implement [`schemars::JsonSchema`] and [`serde::de::DeserializeOwned`].
    type Arguments: JsonSchema + DeserializeOwned;

    /// Executes the tool with the provided arguments.
    fn call(&mut self, arguments: Self::Arguments)
    -> impl Future<Output = Result<ToolOutput>> + Send;
}

/// Output of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    text: String,
    images: Vec<Image>,
    keep_in_context: bool,
    stub: Option<String>,
    backing_blob_id: Option<String>,
    supersession_key: Option<String>,
}

impl ToolOutput {
    /// Plain text output that stays in context.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keep_in_context: true,
            ..Self::default()
        }
    }

    /// Image output. Never kept in context past the turn that produced it.
    pub fn images(text: impl Into<String>, images: impl IntoIterator<Item = Image>) -> Self {
        Self {
            text: text.into(),
            images: images.into_iter().collect(),
            keep_in_context: false,
            ..Self::default()
        }
    }

    /// Marks the output as one-shot, replaced by `stub` once the model has seen it.
    #[must_use]
    pub fn ephemeral(mut self, stub: impl Into<String>) -> Self {
        self.keep_in_context = false;
        self.stub = Some(stub.into());
        self
    }

    /// Records that the full output already lives in the blob store under `id`.
    #[must_use]
    pub fn with_backing_blob(mut self, id: impl Into<String>) -> Self {
        self.backing_blob_id = Some(id.into());
        self
    }

    /// Marks the output as the latest version of whatever `key` names, e.g. a file path.
    ///
    /// Once a later result of the same tool carries the same key, this one is stubbed.
    #[must_use]
    pub fn superseding(mut self, key: impl Into<String>) -> Self {
        self.supersession_key = Some(key.into());
        self
    }

    /// Text payload.
    #[must_use]
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Image payloads.
    #[must_use]
    pub fn image_parts(&self) -> &[Image] {
        &self.images
    }

    /// Whether the output should survive compaction.
    #[must_use]
    pub fn keep_in_context(&self) -> bool {
        self.keep_in_context && self.images.is_empty()
    }

    /// Custom stub text, if the tool provided one.
    #[must_use]
    pub fn stub(&self) -> Option<&str> {
        self.stub.as_deref()
    }

    /// Blob backing the full output, if any.
    #[must_use]
    pub fn backing_blob_id(&self) -> Option<&str> {
        self.backing_blob_id.as_deref()
    }

    /// Key under which later results of the same tool supersede this one.
    #[must_use]
    pub fn supersession_key(&self) -> Option<&str> {
        self.supersession_key.as_deref()
    }

    /// Splits the output into text and images.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Image>) {
        (self.text, self.images)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// Serializes a value to a pretty JSON string.
///
/// Convenience function for tools that return JSON responses. Strings are returned
/// without quotes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized to JSON.
pub fn json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(value
        .as_str()
        .map_or_else(|| format!("{value:#}"), ToString::to_string))
}

trait ToolImpl: Send + Sync {
    fn call(&mut self, args: &str) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + '_>>;
    fn definition(&self) -> ToolDefinition;
}

impl<T: Tool> ToolImpl for T {
    fn call(&mut self, args: &str) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + '_>> {
        let args = args.to_owned();
        Box::pin(async move {
            let arguments: T::Arguments = serde_json::from_str(&args)?;
            Tool::call(self, arguments).await
        })
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self)
    }
}

/// Tool definition including schema for language models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    arguments: Schema,
}

impl ToolDefinition {
    /// Creates a tool definition for a given tool.
    #[must_use]
    pub fn new<T: Tool>(tool: &T) -> Self {
        Self {
            name: tool.name(),
            description: tool.description(),
            arguments: schema_for!(T::Arguments),
        }
    }

    /// Creates a definition from a name, description and argument type.
    ///
    /// Used for tools dispatched outside a [`Tools`] registry.
    #[must_use]
    pub fn for_arguments<A: JsonSchema>(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: schema_for!(A),
        }
    }

    /// Returns the tool's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool's description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the JSON schema for the tool's arguments.
    #[must_use]
    pub const fn arguments_schema(&self) -> &Schema {
        &self.arguments
    }
}

/// Tool registry for managing and calling tools by name.
#[derive(Default)]
pub struct Tools {
    tools: BTreeMap<String, Box<dyn ToolImpl>>,
}

impl Debug for Tools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tools")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Tools {
    /// Creates a new empty tools registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Returns definitions of all registered tools.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Registers a new tool. Replaces existing tool with same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools
            .insert(tool.name().into_owned(), Box::new(tool) as Box<dyn ToolImpl>);
    }

    /// Removes a tool from the registry.
    pub fn unregister(&mut self, name: &str) {
        self.tools.remove(name);
    }

    /// Returns `true` if a tool named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Calls a tool by name with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is not found, arguments cannot be parsed,
    /// or tool execution fails.
    pub async fn call(&mut self, name: &str, args: &str) -> Result<ToolOutput> {
        match self.tools.get_mut(name) {
            Some(tool) => tool.call(args).await,
            None => Err(anyhow::Error::msg(format!("Tool '{name}' not found"))),
        }
    }
}

/// Arguments accepted by tools that take none.
#[derive(Debug, Clone, Copy, Default, JsonSchema, Deserialize)]
pub struct NoArguments {}
