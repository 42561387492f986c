//! Demo that runs a small embedded batch through dedup + compile with the
//! mock generation backend (no API key needed).

use std::time::Duration;

use chrono::{TimeZone, Utc};
use story_compiler::embed::HashingEmbedder;
use story_compiler::generate::{MockProvider, TimedClient};
use story_compiler::{compile_headlines, GroupingStrategy, RawHeadline, StylePrefs};

fn headline(id: &str, title: &str, description: &str, day: u32) -> RawHeadline {
    RawHeadline {
        id: id.into(),
        title: title.into(),
        description: Some(description.into()),
        url: format!("https://example.test/{id}"),
        published_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).single(),
        source: "demo-feed".into(),
        dedup_group_id: None,
        heat_score: None,
        is_best_version: false,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let batch = vec![
        headline(
            "h1",
            "OpenAI raises $40 billion in record funding round",
            "The round values the company at $300 billion.",
            3,
        ),
        headline(
            "h2",
            "OpenAI raises $40 billion in record funding round",
            "Led by SoftBank, the round values the AI firm at roughly $300 billion and \
             is the largest private tech raise on record.",
            3,
        ),
        headline(
            "h3",
            "Quantum startup unveils error-corrected chip",
            "A 48-qubit logical processor demonstrated below-threshold error rates.",
            4,
        ),
    ];

    let embedder = HashingEmbedder::new(512);
    let client = TimedClient::new(
        MockProvider {
            fixed: "Mock generated text.".into(),
        },
        Duration::from_secs(5),
    );
    let prefs = StylePrefs::default();

    let (groups, outcome) = compile_headlines(
        batch,
        GroupingStrategy::Embedding,
        0.75,
        &prefs,
        &embedder,
        &client,
    )
    .await
    .expect("compile failed");

    println!(
        "{} groups, {} items compiled, {} skipped",
        groups.len(),
        outcome.items.len(),
        outcome.skipped
    );
    for item in &outcome.items {
        println!(
            "- [heat {}] {} (sources: {})",
            item.heat_score,
            item.topic,
            item.source_headline_ids.len()
        );
        println!("  hook:    {}", item.hook);
        println!(
            "  summary: {}",
            item.summary.lines().next().unwrap_or_default()
        );
    }

    println!("compile-demo done");
}
