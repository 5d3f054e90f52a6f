//! Paged task execution over stored data.
//!
//! A task applies one instruction to every page of a blob. Each page is handled by
//! an isolated model call that sees only the task prompt and the page itself, never
//! the agent's conversation. Page outputs are then combined according to an
//! [`AggregationStrategy`] and the combined result is stored back as a
//! [`ContentType::TaskResult`] blob.

use std::collections::BTreeSet;
use std::time::Duration;

use hyperfocus_blobs::{BlobStore, ContentType, Metadata};
use hyperfocus_core::{LLMRequest, LanguageModel, Message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chunking::{Page, TaskChunker};
use crate::config::{AgentConfig, RouterConfig};
use crate::error::TaskError;
use crate::router::{Backend, Backends, route};

const TASK_SYSTEM_PROMPT: &str = include_str!("prompts/task_system.txt");
const TASK_PAGE_TEMPLATE: &str = include_str!("prompts/task_page.txt");
const TASK_SUMMARIZE_TEMPLATE: &str = include_str!("prompts/task_summarize.txt");

/// Separator placed between page outputs when concatenating.
pub const PAGE_SEPARATOR: &str = "\n\n--- Page Break ---\n\n";

/// Blob metadata key marking the first row of a table as its header.
pub const HAS_HEADER: &str = "has_header";

/// How per-page outputs are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Join page outputs in order, separated by page breaks.
    #[default]
    Concatenate,
    /// Ask the model to merge all page outputs into one answer.
    Summarize,
}

/// Everything a task run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    /// Output of every page in ordinal order; failed pages hold their failure notice.
    pub per_page: Vec<String>,
    /// Combined result.
    pub aggregated: String,
    /// Ordinals of pages whose model call failed.
    pub failures: BTreeSet<usize>,
    /// Table rows dropped by the row cap.
    pub rows_excluded: usize,
}

impl TaskResult {
    /// Number of pages processed.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.per_page.len()
    }
}

/// A finished task and where its result was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Full result.
    pub result: TaskResult,
    /// Blob holding [`TaskResult::aggregated`].
    pub result_blob_id: String,
}

impl TaskOutcome {
    /// One-line summary naming the result blob.
    #[must_use]
    pub fn pointer(&self) -> String {
        let mut pointer = format!("Task processed {} page(s)", self.result.pages());
        if !self.result.failures.is_empty() {
            pointer.push_str(&format!(", {} failed", self.result.failures.len()));
        }
        if self.result.rows_excluded > 0 {
            pointer.push_str(&format!(
                ", {} row(s) beyond the row cap were excluded",
                self.result.rows_excluded
            ));
        }
        pointer.push_str(&format!(". Result stored as '{}'.", self.result_blob_id));
        pointer
    }
}

/// Runs paged tasks against a set of backends.
#[derive(Debug)]
pub struct TaskExecutor<'a, D, H = D, M = D> {
    backends: &'a Backends<D, H, M>,
    chunker: &'a TaskChunker,
    router: RouterConfig,
    row_cap: usize,
    timeout: Duration,
}

impl<'a, D, H, M> TaskExecutor<'a, D, H, M>
where
    D: LanguageModel,
    H: LanguageModel,
    M: LanguageModel,
{
    /// Creates an executor using the routing, row cap and timeout settings of `config`.
    pub const fn new(
        backends: &'a Backends<D, H, M>,
        chunker: &'a TaskChunker,
        config: &AgentConfig,
    ) -> Self {
        Self {
            backends,
            chunker,
            router: config.router,
            row_cap: config.task.row_cap,
            timeout: config.backend_timeout,
        }
    }

    /// Applies `instruction` to every page of blob `blob_id` and stores the result.
    ///
    /// Pages are processed one after another. A failing page is recorded and the
    /// remaining pages still run.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Blob`] if the blob is missing or binary
    /// - [`TaskError::EmptyContent`] if there is nothing to process
    /// - [`TaskError::AllPagesFailed`] if no page succeeded
    /// - [`TaskError::Backend`] if the summarizing call failed
    pub async fn run(
        &self,
        store: &mut BlobStore,
        blob_id: &str,
        instruction: &str,
        page_size: usize,
        aggregation: AggregationStrategy,
    ) -> Result<TaskOutcome, TaskError> {
        let input = self.prepare(store, blob_id)?;
        let pages = self.chunker.chunk_text(&input.body, page_size).await;
        if pages.is_empty() {
            return Err(TaskError::EmptyContent {
                id: blob_id.to_owned(),
            });
        }

        let total = pages.len();
        let mut per_page = Vec::with_capacity(total);
        let mut failures = BTreeSet::new();
        let mut last_error = String::new();

        for page in &pages {
            match self.process_page(instruction, page, total, input.header.as_deref()).await {
                Ok(output) => {
                    tracing::debug!(ordinal = page.ordinal, pages = total, "page processed");
                    per_page.push(output);
                }
                Err(reason) => {
                    tracing::warn!(ordinal = page.ordinal, pages = total, error = %reason, "page failed");
                    per_page.push(format!(
                        "[Page {} of {total} failed: {reason}]",
                        page.ordinal + 1
                    ));
                    failures.insert(page.ordinal);
                    last_error = reason;
                }
            }
        }

        if failures.len() == total {
            return Err(TaskError::AllPagesFailed {
                pages: total,
                last_error,
            });
        }

        let aggregated = match aggregation {
            AggregationStrategy::Concatenate => per_page.join(PAGE_SEPARATOR),
            AggregationStrategy::Summarize => self.summarize(instruction, &per_page).await?,
        };

        let metadata = Metadata::from([
            ("source_blob".to_owned(), json!(blob_id)),
            ("instruction".to_owned(), json!(instruction)),
            ("pages".to_owned(), json!(total)),
            ("failed_pages".to_owned(), json!(failures)),
            ("rows_excluded".to_owned(), json!(input.rows_excluded)),
        ]);
        let result_blob_id =
            store.put_from("task", aggregated.clone(), ContentType::TaskResult, metadata);
        tracing::info!(id = %result_blob_id, pages = total, failed = failures.len(), "task result stored");

        Ok(TaskOutcome {
            result: TaskResult {
                per_page,
                aggregated,
                failures,
                rows_excluded: input.rows_excluded,
            },
            result_blob_id,
        })
    }

    fn prepare(&self, store: &BlobStore, blob_id: &str) -> Result<TaskInput, TaskError> {
        let entry = store.get(blob_id)?;
        let text = entry.require_text()?;
        if text.trim().is_empty() {
            return Err(TaskError::EmptyContent {
                id: blob_id.to_owned(),
            });
        }
        if !entry.content_type().is_tabular() {
            return Ok(TaskInput {
                body: text.to_owned(),
                header: None,
                rows_excluded: 0,
            });
        }

        let has_header = entry
            .metadata()
            .get(HAS_HEADER)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let mut rows = text.split_inclusive('\n');
        let header = if has_header {
            rows.next().map(|row| row.trim_end().to_owned())
        } else {
            None
        };
        let rows: Vec<&str> = rows.filter(|row| !row.trim().is_empty()).collect();
        let rows_excluded = rows.len().saturating_sub(self.row_cap);
        if rows_excluded > 0 {
            tracing::info!(kept = self.row_cap, excluded = rows_excluded, "row cap applied");
        }

        Ok(TaskInput {
            body: rows.into_iter().take(self.row_cap).collect(),
            header,
            rows_excluded,
        })
    }

    async fn process_page(
        &self,
        instruction: &str,
        page: &Page,
        total: usize,
        header: Option<&str>,
    ) -> Result<String, String> {
        let header = header.map_or_else(String::new, |row| format!("\nColumns: {row}\n"));
        let number = (page.ordinal + 1).to_string();
        let total = total.to_string();
        let prompt = render(
            TASK_PAGE_TEMPLATE,
            &[
                ("instruction", instruction),
                ("page", number.as_str()),
                ("pages", total.as_str()),
                ("header", header.as_str()),
                ("data", page.content.as_str()),
            ],
        );
        self.isolated_call(prompt)
            .await
            .map_err(|(_, reason)| reason)
    }

    async fn summarize(&self, instruction: &str, per_page: &[String]) -> Result<String, TaskError> {
        let results = per_page
            .iter()
            .enumerate()
            .map(|(index, output)| format!("--- Page {} ---\n{output}", index + 1))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render(
            TASK_SUMMARIZE_TEMPLATE,
            &[("instruction", instruction), ("results", results.as_str())],
        );
        self.isolated_call(prompt)
            .await
            .map_err(|(backend, reason)| TaskError::Backend { backend, reason })
    }

    /// One model call with a fresh two-message history.
    async fn isolated_call(&self, prompt: String) -> Result<String, (Backend, String)> {
        let messages = vec![Message::system(TASK_SYSTEM_PROMPT), Message::user(prompt)];
        let decision = route(&messages, &self.router);
        self.backends
            .complete(decision.backend, LLMRequest::new(messages), self.timeout)
            .await
            .map(|completion| completion.content)
            .map_err(|error| (decision.backend, error.to_string()))
    }
}

/// Fills `{key}` placeholders of `template` in a single pass.
///
/// Substituted values are never scanned again, so placeholder-like text inside an
/// instruction or a page stays literal. Unknown placeholders are kept as written.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];
        let filled = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match filled {
            Some((close, value)) => {
                rendered.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

struct TaskInput {
    body: String,
    header: Option<String>,
    rows_excluded: usize,
}
