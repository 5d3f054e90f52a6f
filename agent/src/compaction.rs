//! Iteration-aware compaction of tool results.
//!
//! Before every model call the message log is rewritten: tool results whose metadata
//! says they need not stay in context, and which the model has already seen once, are
//! replaced with their stub. Results superseded by a newer result of the same tool
//! and key are replaced too, whatever their age. Everything else passes through
//! untouched.

use std::collections::HashMap;

use hyperfocus_core::Message;

use crate::state::{ConversationState, superseded_stub};

/// Outcome of [`apply_compaction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Messages replaced by a stub in this pass.
    pub stubbed: usize,
    /// Messages in the log after compaction.
    pub total: usize,
}

/// Produces the compacted message list for `state` without modifying it.
///
/// A tool result is stubbed when its metadata has `include_in_context == false` and
/// it is at least one iteration old, or when a later result of the same tool carries
/// the same supersession key. Tool results without metadata are kept.
#[must_use]
pub fn compact(state: &ConversationState) -> Vec<Message> {
    let current = state.current_iteration();
    let latest = latest_versions(state);
    state
        .messages()
        .iter()
        .map(|message| {
            let Message::Tool {
                tool_call_id,
                tool_name,
                ..
            } = message
            else {
                return message.clone();
            };
            let Some(meta) = state.metadata(tool_call_id) else {
                return message.clone();
            };
            let superseded = meta.supersession_key.as_deref().filter(|key| {
                latest.get(&(tool_name.as_str(), *key)).copied() != Some(tool_call_id.as_str())
            });
            let content = if let Some(key) = superseded {
                superseded_stub(tool_name, key)
            } else {
                let age = current.saturating_sub(meta.created_at_iteration);
                if meta.include_in_context || age < 1 {
                    return message.clone();
                }
                meta.stub_message.clone()
            };
            Message::Tool {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                content,
                images: Vec::new(),
            }
        })
        .collect()
}

/// Maps every `(tool, supersession key)` pair to the call id of its last result.
fn latest_versions(state: &ConversationState) -> HashMap<(&str, &str), &str> {
    let mut latest = HashMap::new();
    for message in state.messages() {
        let Message::Tool {
            tool_call_id,
            tool_name,
            ..
        } = message
        else {
            continue;
        };
        if let Some(key) = state
            .metadata(tool_call_id)
            .and_then(|meta| meta.supersession_key.as_deref())
        {
            latest.insert((tool_name.as_str(), key), tool_call_id.as_str());
        }
    }
    latest
}

/// Compacts `state` in place by swapping in the list produced by [`compact`].
pub fn apply_compaction(state: &mut ConversationState) -> CompactionReport {
    let compacted = compact(state);
    let current = state.current_iteration();
    let stubbed = state
        .messages()
        .iter()
        .zip(&compacted)
        .filter(|(before, after)| before != after)
        .inspect(|(_, after)| {
            if let Some(call_id) = after.tool_call_id() {
                let age = state
                    .metadata(call_id)
                    .map_or(0, |meta| current.saturating_sub(meta.created_at_iteration));
                tracing::debug!(call_id, age, "tool result stubbed");
            }
        })
        .count();
    let total = compacted.len();
    state.replace_messages(compacted);
    CompactionReport { stubbed, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::default_stub;
    use hyperfocus_blobs::BlobStore;
    use hyperfocus_core::{Image, ToolOutput};

    fn state_with(outputs: Vec<(&str, ToolOutput)>) -> (ConversationState, BlobStore) {
        state_from(outputs.into_iter().map(|(id, output)| (id, "lookup", output)).collect())
    }

    fn state_from(outputs: Vec<(&str, &str, ToolOutput)>) -> (ConversationState, BlobStore) {
        let mut state = ConversationState::new();
        let mut store = BlobStore::new();
        state.push(Message::user("go"));
        for (id, tool, output) in outputs {
            state.record_tool_result(&mut store, id, tool, output, 10_000);
        }
        (state, store)
    }

    #[test]
    fn fresh_results_are_never_stubbed() {
        let (state, _) = state_with(vec![("c1", ToolOutput::text("seen once").ephemeral("[gone]"))]);
        assert_eq!(compact(&state), state.messages());
    }

    #[test]
    fn stale_ephemeral_results_are_stubbed() {
        let (mut state, _) = state_with(vec![
            ("keep", ToolOutput::text("important")),
            ("drop", ToolOutput::text("bulky page").ephemeral("[page]")),
            (
                "img",
                ToolOutput::images("shot", [Image::inline("image/png", "AA==")]),
            ),
        ]);
        state.advance_iteration();

        let report = apply_compaction(&mut state);
        assert_eq!(report, CompactionReport { stubbed: 2, total: 4 });

        let messages = state.messages();
        assert_eq!(messages[0].content(), "go");
        assert_eq!(messages[1].content(), "important");
        assert_eq!(messages[2].content(), "[page]");
        assert_eq!(messages[3].content(), default_stub("lookup"));
        assert!(!messages[3].has_images());
    }

    #[test]
    fn compaction_is_idempotent() {
        let (mut state, _) = state_with(vec![("c1", ToolOutput::text("data").ephemeral("[x]"))]);
        state.advance_iteration();
        apply_compaction(&mut state);
        let once = state.messages().to_vec();

        state.advance_iteration();
        let report = apply_compaction(&mut state);
        assert_eq!(report.stubbed, 0);
        assert_eq!(state.messages(), once.as_slice());
    }

    #[test]
    fn results_without_metadata_pass_through() {
        let mut state = ConversationState::new();
        state.push(Message::tool("orphan", "lookup", "raw output"));
        state.advance_iteration();
        state.advance_iteration();
        assert_eq!(compact(&state)[0].content(), "raw output");
    }

    #[test]
    fn older_versions_of_the_same_key_are_superseded() {
        let (mut state, _) = state_from(vec![
            ("call_1", "create_script", ToolOutput::text("v1 written").superseding("/tmp/test.py")),
            ("call_2", "create_script", ToolOutput::text("v2 written").superseding("/tmp/test.py")),
            ("call_3", "create_script", ToolOutput::text("v3 written").superseding("/tmp/test.py")),
            ("call_4", "create_script", ToolOutput::text("other written").superseding("/tmp/other.py")),
            ("call_5", "read_file", ToolOutput::text("contents").superseding("/tmp/test.py")),
        ]);

        let report = apply_compaction(&mut state);
        assert_eq!(report.stubbed, 2);

        let contents: Vec<&str> = state.messages()[1..].iter().map(Message::content).collect();
        let stub = superseded_stub("create_script", "/tmp/test.py");
        assert_eq!(
            contents,
            [stub.as_str(), stub.as_str(), "v3 written", "other written", "contents"]
        );

        state.advance_iteration();
        assert_eq!(apply_compaction(&mut state).stubbed, 0);
        assert_eq!(state.messages()[3].content(), "v3 written");
    }

    #[test]
    fn a_newer_version_retires_a_fresh_one() {
        let (mut state, mut store) = state_with(vec![(
            "c1",
            ToolOutput::text("first draft").superseding("notes"),
        )]);
        assert_eq!(compact(&state), state.messages());

        state.record_tool_result(
            &mut store,
            "c2",
            "lookup",
            ToolOutput::text("second draft").superseding("notes"),
            10_000,
        );
        let compacted = compact(&state);
        assert_eq!(compacted[1].content(), superseded_stub("lookup", "notes"));
        assert_eq!(compacted[2].content(), "second draft");
    }
}
