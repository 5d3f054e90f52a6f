//! The orchestrating agent.
//!
//! Each iteration of [`Agent::query`] runs in a fixed order:
//!
//! 1. compact the history ([`apply_compaction`]);
//! 2. pick a backend for the compacted history ([`route`]);
//! 3. call it with the configured timeout and advance the iteration counter;
//! 4. run every requested tool call in order and record its result.
//!
//! The loop ends when the model answers without tool calls, or with
//! [`AgentError::MaxIterations`]. Nothing runs concurrently: tool calls, model calls
//! and compaction never overlap.

use hyperfocus_blobs::{BlobStore, ContentType, Metadata};
use hyperfocus_core::{LLMRequest, LanguageModel, Message, Tool, ToolCall, ToolDefinition, ToolOutput, Tools};

use crate::{
    builder::AgentBuilder,
    chunking::TaskChunker,
    compaction::apply_compaction,
    config::AgentConfig,
    error::{AgentError, Result},
    router::{Backends, route},
    state::{ConversationState, ResultMetadata},
    task::{AggregationStrategy, TaskExecutor, TaskOutcome},
    tools::{self, BuiltinCall, TaskSource},
};

const AGENT_SYSTEM_PROMPT: &str = include_str!("prompts/agent_system.txt");
/// Blob id prefix for text handed to `run_task` inline.
const INLINE_SOURCE: &str = "task_input";

/// An autonomous agent that keeps its context small.
///
/// Large tool results are moved into a session [`BlobStore`] and replaced by stubs,
/// stale one-shot results are compacted away, and every model call is routed to the
/// default, high-capacity or multimodal backend.
///
/// # Example
///
/// ```rust,ignore
/// let mut agent = Agent::builder(small_model)
///     .high_capacity_model(large_model)
///     .multimodal_model(vision_model)
///     .tool(ReadCsv::new("data/"))
///     .build();
///
/// let answer = agent.query("Which region sold the most last quarter?").await?;
/// ```
#[derive(Debug)]
pub struct Agent<D, H = D, M = D> {
    pub(crate) backends: Backends<D, H, M>,
    pub(crate) tools: Tools,
    pub(crate) chunker: TaskChunker,
    pub(crate) config: AgentConfig,
    pub(crate) state: ConversationState,
    pub(crate) store: BlobStore,
}

impl<LLM: LanguageModel + Clone> Agent<LLM> {
    /// Creates an agent that uses `llm` for every backend role.
    #[must_use]
    pub fn new(llm: LLM) -> Self {
        Self::with_config(llm, AgentConfig::default())
    }

    /// Creates an agent with `config` that uses `llm` for every backend role.
    #[must_use]
    pub fn with_config(llm: LLM, config: AgentConfig) -> Self {
        Self::from_parts(Backends::uniform(llm), Tools::new(), TaskChunker::new(), config)
    }

    /// Returns a builder for more complex agent construction.
    pub fn builder(llm: LLM) -> AgentBuilder<LLM> {
        AgentBuilder::new(llm)
    }
}

impl<D, H, M> Agent<D, H, M>
where
    D: LanguageModel,
    H: LanguageModel,
    M: LanguageModel,
{
    pub(crate) fn from_parts(
        backends: Backends<D, H, M>,
        tools: Tools,
        chunker: TaskChunker,
        config: AgentConfig,
    ) -> Self {
        Self {
            backends,
            tools,
            chunker,
            config,
            state: ConversationState::new(),
            store: BlobStore::new(),
        }
    }

    /// Sends `prompt` and runs the tool loop until the model gives a final answer.
    ///
    /// The conversation carries over between calls.
    ///
    /// # Errors
    ///
    /// - [`AgentError::BackendUnavailable`] if a model call fails or times out
    /// - [`AgentError::Task`] if a `run_task` call fails as a whole (every page failed,
    ///   or the summarizing call failed)
    /// - [`AgentError::MaxIterations`] if the model keeps calling tools past the limit
    ///
    /// Other tool failures are not errors; they are shown to the model as the tool result.
    pub async fn query(&mut self, prompt: &str) -> Result<String> {
        if self.state.messages().is_empty() {
            self.state.push(Message::system(self.system_prompt()));
        }
        self.state.push(Message::user(prompt));

        for _ in 0..self.config.max_iterations {
            let report = apply_compaction(&mut self.state);
            if report.stubbed > 0 {
                tracing::debug!(stubbed = report.stubbed, total = report.total, "history compacted");
            }

            let decision = route(self.state.messages(), &self.config.router);
            let request = LLMRequest::new(self.state.messages().to_vec()).with_tools(self.definitions());
            let completion = self
                .backends
                .complete(decision.backend, request, self.config.backend_timeout)
                .await?;
            let iteration = self.state.advance_iteration();

            if !completion.has_tool_calls() {
                let answer = completion.content.clone();
                self.state.push(completion.into_message());
                tracing::info!(iteration, "query answered");
                return Ok(answer);
            }

            let calls = completion.tool_calls.clone();
            self.state.push(completion.into_message());
            for call in &calls {
                let output = self.execute(call).await?;
                self.record_tool_result(&call.id, &call.name, output);
            }
        }

        Err(AgentError::MaxIterations {
            limit: self.config.max_iterations,
        })
    }

    /// Runs a paged task over stored data and stores the result.
    ///
    /// `page_size` falls back to [`TaskConfig::page_size`](crate::TaskConfig::page_size).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Task`] when the data cannot be read, every page fails,
    /// or the summarizing call fails.
    pub async fn run_task(
        &mut self,
        blob_id: &str,
        instruction: &str,
        page_size: Option<usize>,
        aggregation: AggregationStrategy,
    ) -> Result<TaskOutcome> {
        let executor = TaskExecutor::new(&self.backends, &self.chunker, &self.config);
        let page_size = page_size.unwrap_or(self.config.task.page_size);
        Ok(executor
            .run(&mut self.store, blob_id, instruction, page_size, aggregation)
            .await?)
    }

    /// Records a tool result produced outside [`Agent::query`].
    ///
    /// The result is dated with the current iteration, moved into the blob store when
    /// it exceeds the oversize threshold, and appended to the history.
    pub fn record_tool_result(
        &mut self,
        call_id: &str,
        tool_name: &str,
        output: ToolOutput,
    ) -> ResultMetadata {
        self.state.record_tool_result(
            &mut self.store,
            call_id,
            tool_name,
            output,
            self.config.oversize_threshold,
        )
    }

    /// Registers a tool. Names of built-in data tools are reserved.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the name clashes with a built-in tool.
    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        let name = tool.name();
        if tools::is_builtin(&name) {
            return Err(AgentError::Config(format!(
                "tool name '{name}' is reserved by a built-in tool"
            )));
        }
        self.tools.register(tool);
        Ok(())
    }

    /// The conversation state.
    #[must_use]
    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// The session blob store.
    #[must_use]
    pub const fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Mutable access to the session blob store, e.g. to preload data.
    pub const fn store_mut(&mut self) -> &mut BlobStore {
        &mut self.store
    }

    /// The agent configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn system_prompt(&self) -> String {
        match &self.config.system_prompt {
            Some(custom) => format!("{custom}\n\n{AGENT_SYSTEM_PROMPT}"),
            None => AGENT_SYSTEM_PROMPT.to_owned(),
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = tools::definitions();
        definitions.extend(self.tools.definitions());
        definitions
    }

    async fn execute(&mut self, call: &ToolCall) -> Result<ToolOutput> {
        let arguments = call.arguments_json();
        let result = match BuiltinCall::parse(&call.name, &arguments) {
            Some(Ok(builtin)) => self.execute_builtin(builtin).await?,
            Some(Err(error)) => Err(error),
            None => self.tools.call(&call.name, &arguments).await,
        };

        Ok(result.unwrap_or_else(|error| {
            tracing::warn!(call_id = %call.id, tool = %call.name, %error, "tool call failed");
            ToolOutput::text(format!("Error: {error}"))
        }))
    }

    /// Runs a built-in tool. The outer error ends the query; the inner one is shown
    /// to the model.
    async fn execute_builtin(
        &mut self,
        call: BuiltinCall,
    ) -> Result<hyperfocus_core::Result<ToolOutput>> {
        match call {
            BuiltinCall::RunTask(mut args) => {
                let blob_id = match args.source() {
                    Ok(TaskSource::Stored(id)) => id,
                    Ok(TaskSource::Inline(text)) => {
                        let id = self
                            .store
                            .put_from(INLINE_SOURCE, text, ContentType::Text, Metadata::new());
                        tracing::debug!(id = %id, "inline task input stored");
                        id
                    }
                    Err(error) => return Ok(Err(error)),
                };
                let aggregation = args.aggregation.unwrap_or_default();
                match self
                    .run_task(&blob_id, &args.prompt, args.page_size, aggregation)
                    .await
                {
                    Ok(outcome) => {
                        let text = format!("{}\n\n{}", outcome.pointer(), outcome.result.aggregated);
                        Ok(Ok(ToolOutput::text(text).with_backing_blob(outcome.result_blob_id)))
                    }
                    Err(AgentError::Task(error)) if error.is_total_failure() => {
                        Err(AgentError::Task(error))
                    }
                    Err(error) => Ok(Err(error.into())),
                }
            }
            BuiltinCall::ListStoredData => {
                Ok(Ok(ToolOutput::text(tools::list_stored_data(&self.store))))
            }
            BuiltinCall::StoredDataInfo(args) => {
                Ok(tools::stored_data_info(&self.store, &args.data_id).map(ToolOutput::text))
            }
        }
    }
}
