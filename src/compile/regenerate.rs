// src/compile/regenerate.rs
//! Regeneration adapter: re-run hook and summary for a stored item, with
//! optional caller instructions folded into the directives. All-or-nothing:
//! the stored item changes only when both calls succeed.

use metrics::counter;

use crate::error::{PipelineError, Result};
use crate::generate::{GenerationClient, GenerationRequest};
use crate::metrics::ensure_pipeline_metrics_described;
use crate::storage::PipelineStore;
use crate::story::CompiledItem;

use super::{clean_generated, prompts, StylePrefs};

/// Regenerate one item's hook and summary from its source headlines.
///
/// Free-text `instructions` are prepended verbatim to both generation
/// directives. Only `hook` and `summary` ever change; identity, topic,
/// provenance, heat and selection state are untouched. Any failure leaves
/// the stored item exactly as it was.
pub async fn regenerate_item(
    item_id: &str,
    instructions: Option<&str>,
    prefs: &StylePrefs,
    store: &dyn PipelineStore,
    generator: &dyn GenerationClient,
) -> Result<CompiledItem> {
    ensure_pipeline_metrics_described();
    counter!("regenerate_total").increment(1);

    let stored = store
        .get_item(item_id)
        .await?
        .ok_or_else(|| PipelineError::ItemNotFound(item_id.to_string()))?;

    let members = store.headlines_by_ids(&stored.source_headline_ids).await?;
    if members.is_empty() {
        return Err(PipelineError::MissingProvenance(item_id.to_string()));
    }

    let hook_request = GenerationRequest::new(
        prompts::prepend_instructions(&prompts::hook_system(prefs), instructions),
        prompts::hook_user(&members),
        prompts::HOOK_MAX_TOKENS,
    );
    let summary_request = GenerationRequest::new(
        prompts::prepend_instructions(&prompts::summary_system(prefs), instructions),
        prompts::summary_user(&members),
        prompts::SUMMARY_MAX_TOKENS,
    );

    let (hook_res, summary_res) = tokio::join!(
        generator.generate(&hook_request),
        generator.generate(&summary_request)
    );
    let (hook, summary) = match (hook_res, summary_res) {
        (Ok(h), Ok(s)) => (clean_generated(&h), clean_generated(&s)),
        (Err(e), _) | (_, Err(e)) => {
            counter!("generation_failures_total").increment(1);
            tracing::warn!(item = %item_id, error = %e, "regeneration failed, stored item untouched");
            return Err(e);
        }
    };

    store.update_item_content(item_id, &hook, &summary).await?;
    tracing::info!(item = %item_id, instructed = instructions.is_some(), "item regenerated");

    let mut updated = stored;
    updated.hook = hook;
    updated.summary = summary;
    Ok(updated)
}
