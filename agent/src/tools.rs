//! Built-in data tools.
//!
//! These tools operate on the agent's own blob store and task executor, so the
//! agent dispatches them itself instead of going through the [`Tools`] registry.
//! Their definitions are advertised to the model next to the registered tools.
//!
//! [`Tools`]: hyperfocus_core::Tools

use std::fmt::Write as _;

use hyperfocus_blobs::BlobStore;
use hyperfocus_core::{ToolDefinition, llm::tool::json};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::task::AggregationStrategy;

/// Name of the paged task tool.
pub const RUN_TASK: &str = "run_task";
/// Name of the stored data listing tool.
pub const LIST_STORED_DATA: &str = "list_stored_data";
/// Name of the stored data inspection tool.
pub const STORED_DATA_INFO: &str = "stored_data_info";

/// Arguments of `run_task`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunTaskArgs {
    /// Instruction applied to every page of the data.
    pub prompt: String,
    /// Identifier of the stored data to process. Give this or `data_text`.
    #[serde(default)]
    pub data_id: Option<String>,
    /// Text to process directly, for input that is not stored yet. Give this or `data_id`.
    #[serde(default)]
    pub data_text: Option<String>,
    /// Maximum page size in characters. Defaults to the configured page size.
    #[serde(default)]
    pub page_size: Option<usize>,
    /// How page results are combined. Defaults to `concatenate`.
    #[serde(default)]
    pub aggregation: Option<AggregationStrategy>,
}

/// Where the input of a `run_task` call comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// Data already in the blob store.
    Stored(String),
    /// Text passed inline, stored before the task runs.
    Inline(String),
}

impl RunTaskArgs {
    /// Moves the task input out of the arguments.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one of `data_id` and `data_text` is given.
    pub fn source(&mut self) -> hyperfocus_core::Result<TaskSource> {
        match (self.data_id.take(), self.data_text.take()) {
            (Some(id), None) => Ok(TaskSource::Stored(id)),
            (None, Some(text)) => Ok(TaskSource::Inline(text)),
            (Some(_), Some(_)) => Err(anyhow::anyhow!(
                "'{RUN_TASK}' takes either data_id or data_text, not both"
            )),
            (None, None) => Err(anyhow::anyhow!("'{RUN_TASK}' needs data_id or data_text")),
        }
    }
}

/// Arguments of `list_stored_data`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListStoredDataArgs {}

/// Arguments of `stored_data_info`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StoredDataInfoArgs {
    /// Identifier of the stored data to describe.
    pub data_id: String,
}

/// A parsed call to one of the built-in tools.
#[derive(Debug, Clone)]
pub enum BuiltinCall {
    /// `run_task`
    RunTask(RunTaskArgs),
    /// `list_stored_data`
    ListStoredData,
    /// `stored_data_info`
    StoredDataInfo(StoredDataInfoArgs),
}

impl BuiltinCall {
    /// Parses a call if `name` is a built-in tool. Returns `None` for any other tool.
    ///
    /// # Errors
    ///
    /// The inner result fails when the arguments do not match the tool's schema.
    pub fn parse(name: &str, arguments: &str) -> Option<hyperfocus_core::Result<Self>> {
        let parsed = match name {
            RUN_TASK => serde_json::from_str(arguments).map(Self::RunTask),
            LIST_STORED_DATA => Ok(Self::ListStoredData),
            STORED_DATA_INFO => serde_json::from_str(arguments).map(Self::StoredDataInfo),
            _ => return None,
        };
        Some(parsed.map_err(|e| anyhow::anyhow!("Invalid arguments for '{name}': {e}")))
    }
}

/// Returns `true` if `name` is reserved by a built-in tool.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    matches!(name, RUN_TASK | LIST_STORED_DATA | STORED_DATA_INFO)
}

/// Definitions of the built-in tools.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::for_arguments::<RunTaskArgs>(
            RUN_TASK,
            "Process data page by page with an isolated model call per page. \
             Pass data_id for stored data, such as any id mentioned in a stored-result \
             notice, or data_text for text that is not stored yet. \
             Returns a summary line and the combined result, which is stored as new data.",
        ),
        ToolDefinition::for_arguments::<ListStoredDataArgs>(
            LIST_STORED_DATA,
            "List every stored data item with its type and size.",
        ),
        ToolDefinition::for_arguments::<StoredDataInfoArgs>(
            STORED_DATA_INFO,
            "Describe one stored data item (type, size, creation time, metadata) without its content.",
        ),
    ]
}

/// Renders the store listing shown by `list_stored_data`.
#[must_use]
pub fn list_stored_data(store: &BlobStore) -> String {
    if store.is_empty() {
        return "No stored data.".to_owned();
    }
    let mut listing = format!("{} stored item(s):\n", store.len());
    for (id, content_type, size) in store.list() {
        let _ = writeln!(listing, "- {id} ({content_type}, size {size})");
    }
    listing
}

/// Renders the description shown by `stored_data_info`.
///
/// # Errors
///
/// Fails when `data_id` is unknown.
pub fn stored_data_info(store: &BlobStore, data_id: &str) -> hyperfocus_core::Result {
    let info = store.info(data_id)?;
    json(&info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperfocus_blobs::{ContentType, Metadata};

    #[test]
    fn parses_only_builtin_names() {
        assert!(BuiltinCall::parse("read_file", "{}").is_none());
        assert!(matches!(
            BuiltinCall::parse(LIST_STORED_DATA, "{}"),
            Some(Ok(BuiltinCall::ListStoredData))
        ));

        let call = BuiltinCall::parse(
            RUN_TASK,
            r#"{"data_id":"t_1","prompt":"count","aggregation":"summarize"}"#,
        )
        .unwrap()
        .unwrap();
        let BuiltinCall::RunTask(mut args) = call else {
            panic!("expected run_task");
        };
        assert_eq!(args.page_size, None);
        assert_eq!(args.aggregation, Some(AggregationStrategy::Summarize));
        assert_eq!(args.source().unwrap(), TaskSource::Stored("t_1".into()));
    }

    fn run_task_args(arguments: &str) -> RunTaskArgs {
        match BuiltinCall::parse(RUN_TASK, arguments).unwrap().unwrap() {
            BuiltinCall::RunTask(args) => args,
            other => panic!("expected run_task, got {other:?}"),
        }
    }

    #[test]
    fn run_task_needs_exactly_one_input() {
        let mut inline = run_task_args(r#"{"prompt":"p","data_text":"some text"}"#);
        assert_eq!(inline.source().unwrap(), TaskSource::Inline("some text".into()));

        let mut neither = run_task_args(r#"{"prompt":"p"}"#);
        assert!(neither.source().unwrap_err().to_string().contains("needs data_id or data_text"));

        let mut both = run_task_args(r#"{"prompt":"p","data_id":"a","data_text":"b"}"#);
        assert!(both.source().unwrap_err().to_string().contains("not both"));
    }

    #[test]
    fn bad_arguments_are_reported() {
        let err = BuiltinCall::parse(STORED_DATA_INFO, r#"{"id":1}"#)
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains(STORED_DATA_INFO));
    }

    #[test]
    fn definitions_cover_every_builtin() {
        let defs = definitions();
        assert_eq!(defs.len(), 3);
        assert!(defs.iter().all(|def| is_builtin(def.name())));
    }

    #[test]
    fn listing_and_info() {
        let mut store = BlobStore::new();
        assert_eq!(list_stored_data(&store), "No stored data.");

        let id = store.put("a,b\n1,2\n", ContentType::Table, Metadata::new());
        let listing = list_stored_data(&store);
        assert!(listing.contains(&format!("- {id} (table, size 8)")));

        let info = stored_data_info(&store, &id).unwrap();
        assert!(info.contains(&id));
        assert!(!info.contains("1,2"));
        assert!(stored_data_info(&store, "missing").is_err());
    }
}
