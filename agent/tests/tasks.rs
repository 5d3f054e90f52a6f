//! Paged task execution over stored data.

mod common;

use common::{LineCounter, Script, call};
use hyperfocus_agent::{
    Agent, AgentError, AggregationStrategy, TaskChunker, TaskError,
    blobs::{BlobStore, ContentType, Metadata},
    chunking::split_lines,
    task::PAGE_SEPARATOR,
};
use hyperfocus_core::Completion;
use serde_json::json;

fn numbered_lines(count: usize, width: usize) -> String {
    (0..count)
        .map(|i| format!("{:0>width$}\n", i, width = width - 1))
        .collect()
}

#[tokio::test]
async fn fallback_splits_into_four_pages() {
    let text = numbered_lines(35, 100);
    assert_eq!(text.len(), 3_500);

    let pages = TaskChunker::new().chunk_text(&text, 1_000).await;
    assert_eq!(pages.len(), 4);
    assert_eq!(
        pages.iter().map(|p| p.ordinal).collect::<Vec<_>>(),
        [0, 1, 2, 3]
    );
    assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), 3_500);
    assert!(pages.iter().all(|p| p.len() <= 1_000));
    assert_eq!(pages.iter().map(|p| p.content.as_str()).collect::<String>(), text);
    assert_eq!(pages, split_lines(&text, 1_000));
}

#[tokio::test]
async fn row_cap_limits_tabular_input() {
    let model = LineCounter::default();
    let mut agent = Agent::new(model.clone());
    let table: String = (0..350).map(|i| format!("row{i},{i}\n")).collect();
    let id = agent.store_mut().put(table, ContentType::Table, Metadata::new());

    let outcome = agent
        .run_task(&id, "count rows", None, AggregationStrategy::Concatenate)
        .await
        .unwrap();

    assert_eq!(outcome.result.rows_excluded, 150);
    let processed: usize = outcome
        .result
        .per_page
        .iter()
        .map(|count| count.parse::<usize>().unwrap())
        .sum();
    assert_eq!(processed, 200);

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts.iter().any(|p| p.contains("row199,199")));
    assert!(prompts.iter().all(|p| !p.contains("row200,200")));
}

#[tokio::test]
async fn failed_page_leaves_a_notice_in_place() {
    let mut agent = Agent::new(LineCounter::default());
    let id = agent.store_mut().put(
        "a\nb\nc\nd\ne\nFAIL\ng\nh\n",
        ContentType::Text,
        Metadata::new(),
    );

    let outcome = agent
        .run_task(&id, "count", Some(6), AggregationStrategy::Concatenate)
        .await
        .unwrap();
    let result = &outcome.result;

    assert_eq!(result.pages(), 4);
    assert_eq!(result.failures.iter().copied().collect::<Vec<_>>(), [2]);

    let segments: Vec<&str> = result.aggregated.split(PAGE_SEPARATOR).collect();
    assert_eq!(segments.len(), 4);
    for (index, segment) in segments.iter().enumerate() {
        if index == 2 {
            assert!(segment.starts_with("[Page 3 of 4 failed:"));
        } else {
            assert!(segment.parse::<usize>().is_ok(), "segment {index}: {segment}");
        }
    }
}

#[tokio::test]
async fn every_page_failing_is_a_task_error() {
    let mut agent = Agent::new(LineCounter::default());
    let id = agent
        .store_mut()
        .put("FAIL\nFAIL\n", ContentType::Text, Metadata::new());

    let err = agent
        .run_task(&id, "count", Some(5), AggregationStrategy::Concatenate)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Task(TaskError::AllPagesFailed { pages: 2, .. })
    ));
    assert_eq!(agent.store().len(), 1);
}

#[tokio::test]
async fn total_task_failure_ends_the_query() {
    let script = Script::new([
        call("c1", "run_task", json!({"data_text": "alpha\n", "prompt": "count"})),
        Completion::text("final"),
    ]);
    let mut agent = Agent::new(script.refusing("default", |request| request.tools().is_empty()));

    let err = agent.query("count the data").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::Task(TaskError::AllPagesFailed { pages: 1, .. })
    ));
    assert!(err.to_string().contains("backend down"));
    assert_eq!(script.roles().len(), 2);
    assert!(agent.state().metadata("c1").is_none());
}

#[tokio::test]
async fn failed_summary_ends_the_query() {
    let script = Script::new([
        call(
            "c1",
            "run_task",
            json!({
                "data_text": "alpha\nbeta\n",
                "prompt": "merge",
                "page_size": 6,
                "aggregation": "summarize",
            }),
        ),
        Completion::text("one"),
        Completion::text("two"),
        Completion::text("final"),
    ]);
    let mut agent = Agent::new(script.refusing("default", |request| {
        request
            .messages()
            .last()
            .is_some_and(|m| m.content().contains("--- Page 1 ---"))
    }));

    let err = agent.query("merge the data").await.unwrap_err();
    assert!(matches!(err, AgentError::Task(TaskError::Backend { .. })));
    assert_eq!(script.roles().len(), 4);
}

#[tokio::test]
async fn summarize_sees_failure_notices_in_place() {
    let model = LineCounter::default();
    let mut agent = Agent::new(model.clone());
    let id = agent
        .store_mut()
        .put("a\nFAIL\nb\n", ContentType::Text, Metadata::new());

    let outcome = agent
        .run_task(&id, "count", Some(2), AggregationStrategy::Summarize)
        .await
        .unwrap();

    assert_eq!(outcome.result.pages(), 3);
    assert_eq!(outcome.result.failures.iter().copied().collect::<Vec<_>>(), [1]);
    assert!(outcome.result.per_page[1].starts_with("[Page 2 of 3 failed:"));
    assert_eq!(outcome.result.aggregated, "0");

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 4);
    let summary_prompt = prompts.last().unwrap();
    let first = summary_prompt.find("--- Page 1 ---\n1").unwrap();
    let failed = summary_prompt
        .find("--- Page 2 ---\n[Page 2 of 3 failed:")
        .unwrap();
    let last = summary_prompt.find("--- Page 3 ---\n1").unwrap();
    assert!(first < failed && failed < last);
    assert!(summary_prompt.contains("model refused the page"));
}

#[tokio::test]
async fn inline_text_is_stored_then_processed() {
    let script = Script::new([
        call("c1", "run_task", json!({"data_text": "gamma\ndelta\n", "prompt": "list"})),
        Completion::text("two words"),
        Completion::text("all done"),
    ]);
    let mut agent = Agent::new(script.backend("default"));

    assert_eq!(agent.query("list these").await.unwrap(), "all done");
    assert!(script.request(1).messages()[1].content().contains("gamma\ndelta"));

    let ids: Vec<String> = agent.store().list().map(|(id, _, _)| id.to_owned()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0].starts_with("task_input_"));
    let input = agent.store().get(&ids[0]).unwrap();
    assert_eq!(input.content_type(), ContentType::Text);
    assert_eq!(input.text(), Some("gamma\ndelta\n"));
    assert_eq!(
        agent.store().get(&ids[1]).unwrap().content_type(),
        ContentType::TaskResult
    );
}

#[tokio::test]
async fn result_is_stored_as_task_result() {
    let mut agent = Agent::new(LineCounter::default());
    let id = agent
        .store_mut()
        .put("one\ntwo\nthree\n", ContentType::Text, Metadata::new());

    let outcome = agent
        .run_task(&id, "count", None, AggregationStrategy::Concatenate)
        .await
        .unwrap();

    let stored = agent.store().get(&outcome.result_blob_id).unwrap();
    assert_eq!(stored.content_type(), ContentType::TaskResult);
    assert_eq!(stored.text(), Some("3"));
    assert_eq!(stored.metadata()["source_blob"], json!(id));
}

#[tokio::test]
async fn model_drives_run_task_through_the_tool_loop() {
    let id = BlobStore::new().put("alpha\nbeta\n", ContentType::Text, Metadata::new());
    let script = Script::new([
        call("c1", "run_task", json!({"data_id": id, "prompt": "summarise"})),
        Completion::text("page summary"),
        Completion::text("all done"),
    ]);
    let mut agent = Agent::new(script.backend("default"));
    let preloaded = agent
        .store_mut()
        .put("alpha\nbeta\n", ContentType::Text, Metadata::new());
    assert_eq!(preloaded, id);

    assert_eq!(agent.query("summarise the data").await.unwrap(), "all done");

    let page_request = script.request(1);
    assert_eq!(page_request.messages().len(), 2);
    assert!(page_request.messages()[1].content().contains("alpha\nbeta"));
    assert!(page_request.tools().is_empty());

    let final_request = script.request(2);
    let result = final_request.messages().last().unwrap();
    assert_eq!(result.tool_name(), Some("run_task"));
    assert!(result.content().contains("page summary"));

    let meta = agent.state().metadata("c1").unwrap();
    let backing = meta.backing_blob_id.as_deref().unwrap();
    assert_eq!(
        agent.store().get(backing).unwrap().content_type(),
        ContentType::TaskResult
    );
}

#[tokio::test]
async fn unknown_data_id_is_reported_to_the_model() {
    let script = Script::new([
        call("c1", "run_task", json!({"data_id": "nope", "prompt": "x"})),
        Completion::text("could not find it"),
    ]);
    let mut agent = Agent::new(script.backend("default"));

    agent.query("go").await.unwrap();
    let result = script.request(1).messages().last().unwrap().clone();
    assert!(result.content().starts_with("Error: "));
    assert!(result.content().contains("nope"));
}

#[tokio::test]
async fn summarize_routes_one_extra_call() {
    let script = Script::new([
        Completion::text("first"),
        Completion::text("second"),
        Completion::text("combined"),
    ]);
    let mut agent = Agent::new(script.backend("default"));
    let id = agent
        .store_mut()
        .put("aaaa\nbbbb\n", ContentType::Text, Metadata::new());

    let outcome = agent
        .run_task(&id, "merge", Some(5), AggregationStrategy::Summarize)
        .await
        .unwrap();

    assert_eq!(outcome.result.per_page, ["first", "second"]);
    assert_eq!(outcome.result.aggregated, "combined");
    let summary_prompt = script.request(2).messages()[1].content().to_owned();
    assert!(summary_prompt.contains("first"));
    assert!(summary_prompt.contains("second"));
}
