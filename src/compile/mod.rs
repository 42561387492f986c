// src/compile/mod.rs
//! Group compiler: turns story groups into compiled items. Hook and
//! summary come from two independent generation calls per group; a group
//! only dies when both fail.

pub mod grouping;
pub mod prompts;
pub mod regenerate;
pub mod topic;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::embed::TextEmbedder;
use crate::error::Result;
use crate::generate::adapter::strip_code_fences;
use crate::generate::{GenerationClient, GenerationRequest};
use crate::headline::RawHeadline;
use crate::metrics::ensure_pipeline_metrics_described;
use crate::story::{sort_items_by_heat, CompiledItem, DeduplicationGroup};

/// Optional house-style knobs threaded into hook/summary prompts. Both
/// default to the model's own register.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StylePrefs {
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// How a raw batch gets partitioned into story groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// Embed and cluster on cosine similarity (the default path).
    #[default]
    Embedding,
    /// One structured generation call partitions the batch by topic.
    LlmTopics,
}

/// Batch compile result: the items that made it plus how many groups were
/// dropped because both generation calls failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOutcome {
    pub items: Vec<CompiledItem>,
    pub skipped: usize,
}

/// Compile one group. The hook and summary calls run concurrently; a
/// one-sided failure produces a partial item with that field left as an
/// empty string, and only a both-sided failure is an error.
pub async fn compile_group(
    group: &DeduplicationGroup,
    prefs: &StylePrefs,
    generator: &dyn GenerationClient,
) -> Result<CompiledItem> {
    let hook_request = GenerationRequest::new(
        prompts::hook_system(prefs),
        prompts::hook_user(&group.members),
        prompts::HOOK_MAX_TOKENS,
    );
    let summary_request = GenerationRequest::new(
        prompts::summary_system(prefs),
        prompts::summary_user(&group.members),
        prompts::SUMMARY_MAX_TOKENS,
    );
    let (hook_res, summary_res) = tokio::join!(
        generator.generate(&hook_request),
        generator.generate(&summary_request)
    );

    match (hook_res, summary_res) {
        (Err(hook_err), Err(summary_err)) => {
            counter!("generation_failures_total").increment(2);
            tracing::warn!(
                group = %group.group_id,
                hook_error = %hook_err,
                summary_error = %summary_err,
                "hook and summary generation both failed"
            );
            Err(summary_err)
        }
        (hook_res, summary_res) => {
            let mut hook = String::new();
            let mut summary = String::new();
            match hook_res {
                Ok(text) => hook = clean_generated(&text),
                Err(e) => {
                    counter!("generation_failures_total").increment(1);
                    counter!("compile_partial_total").increment(1);
                    tracing::warn!(group = %group.group_id, error = %e, "hook generation failed, keeping partial item");
                }
            }
            match summary_res {
                Ok(text) => summary = clean_generated(&text),
                Err(e) => {
                    counter!("generation_failures_total").increment(1);
                    counter!("compile_partial_total").increment(1);
                    tracing::warn!(group = %group.group_id, error = %e, "summary generation failed, keeping partial item");
                }
            }
            Ok(CompiledItem::new(
                group.topic.clone(),
                hook,
                summary,
                group.member_ids(),
                group.heat_score,
            ))
        }
    }
}

/// Compile every group sequentially, isolating failures per group: a group
/// whose compile fails is skipped and counted, the rest proceed. Output is
/// heat-sorted regardless of which groups survived.
pub async fn compile_groups(
    groups: &[DeduplicationGroup],
    prefs: &StylePrefs,
    generator: &dyn GenerationClient,
) -> CompileOutcome {
    ensure_pipeline_metrics_described();
    let mut items = Vec::with_capacity(groups.len());
    let mut skipped = 0usize;
    for group in groups {
        match compile_group(group, prefs, generator).await {
            Ok(item) => {
                counter!("compile_items_total").increment(1);
                items.push(item);
            }
            Err(e) => {
                skipped += 1;
                counter!("compile_skipped_total").increment(1);
                tracing::warn!(
                    group = %group.group_id,
                    topic = %group.topic,
                    error = %e,
                    "skipping group after failed compile"
                );
            }
        }
    }
    sort_items_by_heat(&mut items);
    tracing::info!(
        groups = groups.len(),
        items = items.len(),
        skipped,
        "group compilation complete"
    );
    CompileOutcome { items, skipped }
}

/// Full pipeline over a raw batch: partition with the chosen strategy,
/// then compile every group. Returns the groups too so callers can persist
/// member annotations alongside the items.
pub async fn compile_headlines(
    headlines: Vec<RawHeadline>,
    strategy: GroupingStrategy,
    threshold: f32,
    prefs: &StylePrefs,
    embedder: &dyn TextEmbedder,
    generator: &dyn GenerationClient,
) -> Result<(Vec<DeduplicationGroup>, CompileOutcome)> {
    let groups = match strategy {
        GroupingStrategy::Embedding => {
            crate::dedup::run_pass(headlines, threshold, embedder, generator).await?
        }
        GroupingStrategy::LlmTopics => grouping::group_by_topic(headlines, generator).await?,
    };
    let outcome = compile_groups(&groups, prefs, generator).await;
    Ok((groups, outcome))
}

fn clean_generated(raw: &str) -> String {
    strip_code_fences(raw).trim().to_string()
}
