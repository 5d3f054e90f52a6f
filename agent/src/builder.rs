//! Builder for constructing agents with custom configuration.
//!
//! The builder starts with one model in every backend role; the role setters swap
//! individual backends and change the builder's type accordingly.

use hyperfocus_core::{LanguageModel, Tool, Tools};

use crate::{
    agent::Agent,
    chunking::{Segmenter, TaskChunker},
    config::{AgentConfig, RouterConfig, TaskConfig},
    router::Backends,
    tools::is_builtin,
};

/// Builder for constructing agents with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let agent = Agent::builder(small)
///     .high_capacity_model(large)
///     .system_prompt("You analyse sales data.")
///     .tool(ReadCsv::new("data/"))
///     .max_iterations(16)
///     .build();
/// ```
#[must_use]
#[derive(Debug)]
pub struct AgentBuilder<D, H = D, M = D> {
    backends: Backends<D, H, M>,
    tools: Tools,
    chunker: TaskChunker,
    config: AgentConfig,
}

impl<LLM: LanguageModel + Clone> AgentBuilder<LLM> {
    /// Creates a builder that uses `llm` for every backend role.
    pub fn new(llm: LLM) -> Self {
        Self {
            backends: Backends::uniform(llm),
            tools: Tools::new(),
            chunker: TaskChunker::new(),
            config: AgentConfig::default(),
        }
    }
}

impl<D, H, M> AgentBuilder<D, H, M>
where
    D: LanguageModel,
    H: LanguageModel,
    M: LanguageModel,
{
    /// Sets the backend used for histories longer than the routing threshold.
    pub fn high_capacity_model<N: LanguageModel>(self, model: N) -> AgentBuilder<D, N, M> {
        AgentBuilder {
            backends: Backends::new(self.backends.default, model, self.backends.multimodal),
            tools: self.tools,
            chunker: self.chunker,
            config: self.config,
        }
    }

    /// Sets the backend used while the history carries images.
    pub fn multimodal_model<N: LanguageModel>(self, model: N) -> AgentBuilder<D, H, N> {
        AgentBuilder {
            backends: Backends::new(self.backends.default, self.backends.high_capacity, model),
            tools: self.tools,
            chunker: self.chunker,
            config: self.config,
        }
    }

    /// Registers a tool.
    ///
    /// Tools named like a built-in data tool are skipped with a warning.
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        let name = tool.name();
        if is_builtin(&name) {
            tracing::warn!(tool = %name, "tool name reserved by a built-in tool; skipped");
        } else {
            self.tools.register(tool);
        }
        self
    }

    /// Uses `segmenter` to find page boundaries before falling back to line splitting.
    pub fn segmenter(mut self, segmenter: impl Segmenter + 'static) -> Self {
        self.chunker = TaskChunker::with_segmenter(segmenter);
        self
    }

    /// Sets the system prompt.
    ///
    /// The prompt is placed before the built-in instructions for stored data.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum number of iterations (turns).
    ///
    /// The agent will stop and return an error if this limit is exceeded.
    pub const fn max_iterations(mut self, limit: usize) -> Self {
        self.config.max_iterations = limit;
        self
    }

    /// Sets the routing configuration.
    pub const fn router(mut self, router: RouterConfig) -> Self {
        self.config.router = router;
        self
    }

    /// Sets the paged task configuration.
    pub const fn task(mut self, task: TaskConfig) -> Self {
        self.config.task = task;
        self
    }

    /// Sets the full agent configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent<D, H, M> {
        Agent::from_parts(self.backends, self.tools, self.chunker, self.config)
    }
}
