//! Hyperfocus Agent
//!
//! An agent runtime that keeps the model's context small while it works through
//! large tool outputs.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hyperfocus_agent::Agent;
//!
//! let mut agent = Agent::builder(llm)
//!     .high_capacity_model(large_llm)
//!     .tool(ReadCsv::new("data/"))
//!     .build();
//!
//! let answer = agent.query("Summarise the complaints in tickets.csv").await?;
//! ```
//!
//! # How context stays small
//!
//! - **Oversize storage**: tool results above [`AgentConfig::oversize_threshold`]
//!   go to the session [`BlobStore`](hyperfocus_blobs::BlobStore) and the model sees
//!   a stub naming the stored id.
//! - **Compaction**: results a tool marked as one-shot (including every image) are
//!   replaced by their stub once the model has seen them for one iteration.
//! - **Routing**: each model call goes to the multimodal backend while images are
//!   live, to the high-capacity backend for long histories, and to the default
//!   backend otherwise.
//! - **Paged tasks**: the built-in `run_task` tool processes stored data one page
//!   at a time with isolated model calls and stores the combined result.

mod agent;
mod builder;
pub mod chunking;
pub mod compaction;
mod config;
mod error;
pub mod router;
pub mod state;
pub mod task;
pub mod tools;

pub use agent::Agent;
pub use builder::AgentBuilder;
pub use chunking::{Page, Segmenter, TaskChunker};
pub use compaction::{CompactionReport, apply_compaction, compact};
pub use config::{AgentConfig, RouterConfig, TaskConfig};
pub use error::{AgentError, Result, SegmentationError, TaskError};
pub use router::{Backend, Backends, RoutingDecision, RoutingReason, route};
pub use state::{ConversationState, ResultMetadata, default_stub, superseded_stub};
pub use task::{AggregationStrategy, TaskExecutor, TaskOutcome, TaskResult};

#[cfg(feature = "jina")]
pub use chunking::JinaSegmenter;

pub use hyperfocus_blobs as blobs;
pub use hyperfocus_core::{LanguageModel, Tool, ToolOutput};
