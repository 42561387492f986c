// tests/compile_batch.rs
//
// Integration tests for batch compilation: one item per surviving group,
// partial items on one-sided generation failure, skip-and-continue when a
// group dies entirely, and the LLM topic-grouping strategy end to end.

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;

use story_compiler::embed::HashingEmbedder;
use story_compiler::error::{PipelineError, Result};
use story_compiler::generate::{GenerationClient, GenerationRequest};
use story_compiler::{compile_headlines, GroupingStrategy, RawHeadline, StylePrefs};

// --- helpers ---

fn headline(id: &str, title: &str) -> RawHeadline {
    RawHeadline {
        id: id.into(),
        title: title.into(),
        description: None,
        url: format!("https://example.test/{id}"),
        published_at: None,
        source: "feed-a".into(),
        dedup_group_id: None,
        heat_score: None,
        is_best_version: false,
    }
}

/// Answers each call shape with canned text. Hook/summary calls can be
/// scripted to fail wholesale, or only for material containing "Poison".
struct StubClient {
    fail_hooks: bool,
    fail_summaries: bool,
    grouping_json: &'static str,
    systems_seen: Mutex<Vec<String>>,
}

impl StubClient {
    fn ok() -> Self {
        Self {
            fail_hooks: false,
            fail_summaries: false,
            grouping_json: "",
            systems_seen: Mutex::new(Vec::new()),
        }
    }
}

impl GenerationClient for StubClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.systems_seen.lock().push(request.system.clone());
        let poisoned = request.user.contains("Poison");
        let out = if request.system.contains("memberIndices") {
            Ok(self.grouping_json.to_string())
        } else if request.system.contains("hook") {
            if self.fail_hooks || poisoned {
                Err(PipelineError::GenerationFailed("scripted hook failure".into()))
            } else {
                Ok("Hook text.".to_string())
            }
        } else if request.system.contains("summary") {
            if self.fail_summaries || poisoned {
                Err(PipelineError::GenerationFailed(
                    "scripted summary failure".into(),
                ))
            } else {
                Ok("Summary text.".to_string())
            }
        } else {
            Ok("Story label".to_string())
        };
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

// --- happy path ---

#[tokio::test]
async fn compile_produces_one_item_per_group_sorted_by_heat() {
    let batch = vec![
        headline("a1", "Quantum startup announces error-corrected chip"),
        headline("b1", "Major bank reports record quarterly profit"),
        headline("a2", "Quantum startup announces error-corrected chip"),
        headline("a3", "Quantum startup announces error-corrected chip"),
    ];
    let embedder = HashingEmbedder::new(256);
    let client = StubClient::ok();

    let (groups, outcome) = compile_headlines(
        batch,
        GroupingStrategy::Embedding,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect("compile");

    assert_eq!(groups.len(), 2);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.items.len(), 2);

    let hot = &outcome.items[0];
    assert_eq!(hot.heat_score, 3);
    assert_eq!(hot.topic, "Story label");
    assert_eq!(hot.hook, "Hook text.");
    assert_eq!(hot.summary, "Summary text.");
    assert_eq!(hot.source_headline_ids, ["a1", "a2", "a3"]);
    assert!(!hot.is_selected);

    assert_eq!(outcome.items[1].heat_score, 1);
    assert_eq!(outcome.items[1].source_headline_ids, ["b1"]);
}

#[tokio::test]
async fn compile_empty_batch_yields_nothing() {
    let embedder = HashingEmbedder::new(64);
    let client = StubClient::ok();

    let (groups, outcome) = compile_headlines(
        Vec::new(),
        GroupingStrategy::Embedding,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect("compile");

    assert!(groups.is_empty());
    assert!(outcome.items.is_empty());
    assert_eq!(outcome.skipped, 0);
}

#[tokio::test]
async fn compile_threads_style_prefs_into_prompts() {
    let batch = vec![headline("a1", "Central bank surprises with rate cut")];
    let embedder = HashingEmbedder::new(64);
    let client = StubClient::ok();
    let prefs = StylePrefs {
        tone: Some("dry".into()),
        format: Some("bullet list".into()),
    };

    compile_headlines(
        batch,
        GroupingStrategy::Embedding,
        0.75,
        &prefs,
        &embedder,
        &client,
    )
    .await
    .expect("compile");

    let systems = client.systems_seen.lock();
    assert!(
        systems
            .iter()
            .any(|s| s.contains("hook") && s.contains("Tone: dry.")),
        "hook prompt must carry the tone preference"
    );
    assert!(
        systems
            .iter()
            .any(|s| s.contains("summary") && s.contains("Format: bullet list.")),
        "summary prompt must carry the format preference"
    );
}

// --- failure isolation ---

#[tokio::test]
async fn compile_failed_hook_keeps_partial_item_with_empty_marker() {
    let batch = vec![
        headline("a1", "Rail strike halts freight across the region"),
        headline("b1", "New vaccine clears final trial stage"),
    ];
    let embedder = HashingEmbedder::new(256);
    let client = StubClient {
        fail_hooks: true,
        ..StubClient::ok()
    };

    let (_, outcome) = compile_headlines(
        batch,
        GroupingStrategy::Embedding,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect("compile");

    assert_eq!(outcome.skipped, 0, "partial items are not skips");
    assert_eq!(outcome.items.len(), 2);
    for item in &outcome.items {
        assert_eq!(item.hook, "", "failed side is marked by an empty string");
        assert_eq!(item.summary, "Summary text.");
    }
}

#[tokio::test]
async fn compile_skips_groups_where_both_calls_fail_and_continues() {
    let batch = vec![
        headline("p1", "Poisoned artifacts recalled from museum exhibit"),
        headline("g1", "Community garden harvest breaks local record"),
    ];
    let embedder = HashingEmbedder::new(256);
    let client = StubClient::ok();

    let (groups, outcome) = compile_headlines(
        batch,
        GroupingStrategy::Embedding,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect("batch must survive a dead group");

    assert_eq!(groups.len(), 2);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].source_headline_ids, ["g1"]);
}

// --- LLM topic grouping ---

#[tokio::test]
async fn compile_with_llm_topic_grouping_follows_model_assignment() {
    let batch = vec![
        headline("h0", "Chipmaker shares surge on earnings beat"),
        headline("h1", "Bank posts record quarterly profit"),
        headline("h2", "Semiconductor stocks rally after results"),
    ];
    let embedder = HashingEmbedder::new(64);
    let client = StubClient {
        grouping_json: "```json\n{\"groups\":[\
            {\"topic\":\"Chip earnings rally\",\"memberIndices\":[0,2]},\
            {\"topic\":\"Bank profits\",\"memberIndices\":[1]}]}\n```",
        ..StubClient::ok()
    };

    let (groups, outcome) = compile_headlines(
        batch,
        GroupingStrategy::LlmTopics,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect("compile");

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].member_ids(), ["h0", "h2"]);
    assert_eq!(groups[0].topic, "Chip earnings rally");
    assert_eq!(groups[1].member_ids(), ["h1"]);

    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.items[0].heat_score, 2);
    assert_eq!(outcome.items[0].topic, "Chip earnings rally");
    assert_eq!(outcome.items[0].source_headline_ids, ["h0", "h2"]);
}

#[tokio::test]
async fn compile_with_llm_topic_grouping_surfaces_unparsable_replies() {
    let batch = vec![headline("h0", "Some headline for the model")];
    let embedder = HashingEmbedder::new(64);
    let client = StubClient {
        grouping_json: "not json at all",
        ..StubClient::ok()
    };

    let err = compile_headlines(
        batch,
        GroupingStrategy::LlmTopics,
        0.75,
        &StylePrefs::default(),
        &embedder,
        &client,
    )
    .await
    .expect_err("malformed grouping reply must surface");
    assert!(err.is_generation(), "got {err}");
}
