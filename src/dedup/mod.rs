// src/dedup/mod.rs
//! Deduplication pass: embed the batch, cluster on seed similarity, pick a
//! best version per group, label topics.

pub mod best_version;
pub mod cluster;

use std::time::Instant;

use chrono::Utc;
use metrics::{counter, gauge, histogram};

use crate::compile::topic;
use crate::embed::TextEmbedder;
use crate::error::{PipelineError, Result};
use crate::generate::GenerationClient;
use crate::headline::{anon_digest, RawHeadline};
use crate::metrics::ensure_pipeline_metrics_described;
use crate::story::{sort_groups_by_heat, DeduplicationGroup};

/// One full deduplication pass over a pre-collected batch.
///
/// Validates the threshold, normalizes text, embeds the whole batch up
/// front, clusters in input order, selects each group's best version and
/// labels topics, then sorts groups by heat. Member annotations
/// (`dedup_group_id`, `heat_score`, `is_best_version`) are written on the
/// returned members; persisting them is the caller's concern.
///
/// An empty batch is a no-op, not an error.
pub async fn run_pass(
    mut headlines: Vec<RawHeadline>,
    threshold: f32,
    embedder: &dyn TextEmbedder,
    generator: &dyn GenerationClient,
) -> Result<Vec<DeduplicationGroup>> {
    cluster::validate_threshold(threshold)?;
    ensure_pipeline_metrics_described();

    if headlines.is_empty() {
        tracing::info!("deduplication pass over empty batch");
        return Ok(Vec::new());
    }

    let started = Instant::now();
    let batch_len = headlines.len();

    for h in headlines.iter_mut() {
        h.normalize();
    }

    let texts: Vec<String> = headlines.iter().map(|h| h.embedding_text()).collect();
    let embeddings = embedder
        .embed_batch(&texts)
        .await
        .map_err(|e| PipelineError::EmbeddingUnavailable(e.to_string()))?;

    let clusters = cluster::cluster_by_similarity(&embeddings, threshold);

    let now = Utc::now();
    let mut groups: Vec<DeduplicationGroup> = Vec::with_capacity(clusters.len());
    for member_indices in clusters {
        let members: Vec<RawHeadline> = member_indices
            .iter()
            .map(|&i| headlines[i].clone())
            .collect();
        let topic = topic::fallback_topic(&members[0]);
        groups.push(assemble_group(topic, members, now));
    }
    debug_assert_eq!(
        groups.iter().map(|g| g.members.len()).sum::<usize>(),
        batch_len,
        "every headline lands in exactly one group"
    );

    for group in groups.iter_mut() {
        group.topic = topic::label_topic(generator, group).await;
        tracing::debug!(
            group = %group.group_id,
            heat = group.heat_score,
            rep = %anon_digest(&group.representative().title),
            topic = %group.topic,
            "group formed"
        );
    }

    sort_groups_by_heat(&mut groups);

    let singletons = groups.iter().filter(|g| g.heat_score == 1).count();
    counter!("dedup_headlines_total").increment(batch_len as u64);
    counter!("dedup_groups_total").increment(groups.len() as u64);
    counter!("dedup_singletons_total").increment(singletons as u64);
    histogram!("dedup_pass_ms").record(started.elapsed().as_millis() as f64);
    gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);

    tracing::info!(
        headlines = batch_len,
        groups = groups.len(),
        singletons,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "deduplication pass complete"
    );

    Ok(groups)
}

/// Turn one set of same-story members into an annotated group: best
/// version selected, heat fixed to the member count, annotations written
/// on every member. Shared by both grouping strategies.
pub(crate) fn assemble_group(
    topic: String,
    members: Vec<RawHeadline>,
    now: chrono::DateTime<Utc>,
) -> DeduplicationGroup {
    let best_idx = best_version::select_best_version(&members, now);
    let mut group = DeduplicationGroup::new(topic, members, best_idx);
    let group_id = group.group_id;
    let heat = group.heat_score;
    for (i, member) in group.members.iter_mut().enumerate() {
        member.dedup_group_id = Some(group_id);
        member.heat_score = Some(heat);
        member.is_best_version = i == best_idx;
    }
    group
}
