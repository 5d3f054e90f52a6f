//! # hyperfocus
//!
//! High level façade crate that re-exports the hyperfocus workspace. Pull this crate
//! into your binary to run tool-using agents whose context window stays small no
//! matter how much data their tools return.
//!
//! ## What's inside?
//!
//! - [`LanguageModel`] plus the message and tool types every backend speaks.
//! - A session blob store for tool output too large to keep in the conversation.
//! - An [`Agent`](agent::Agent) that compacts stale results, routes each model call to
//!   a default, high-capacity or multimodal backend, and processes stored data page
//!   by page.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperfocus::agent::Agent;
//!
//! async fn demo(small: impl hyperfocus::LanguageModel + Clone, large: impl hyperfocus::LanguageModel)
//!     -> hyperfocus::agent::Result<String>
//! {
//!     let mut agent = Agent::builder(small).high_capacity_model(large).build();
//!     agent.query("Which customers churned last month, and why?").await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: messages, completions, the backend trait and the tool registry.
//! - `blobs`: content-addressed storage for oversized results (feature `blobs`).
//! - `agent`: compaction, routing, paged tasks and the agent loop (feature `agent`).

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use hyperfocus_core as core;
pub use hyperfocus_core::*;

#[cfg(feature = "blobs")]
#[cfg_attr(docsrs, doc(cfg(feature = "blobs")))]
pub use hyperfocus_blobs as blobs;

#[cfg(feature = "agent")]
#[cfg_attr(docsrs, doc(cfg(feature = "agent")))]
pub use hyperfocus_agent as agent;
