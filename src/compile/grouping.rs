// src/compile/grouping.rs
//! Alternate grouping strategy: one structured generation call partitions
//! the batch by topic. The model's answer is loose text; everything here is
//! about turning it into groups that still satisfy the partition invariant.

use chrono::Utc;
use serde::Deserialize;

use crate::dedup::assemble_group;
use crate::error::{PipelineError, Result};
use crate::generate::adapter::strip_code_fences;
use crate::generate::{GenerationClient, GenerationRequest};
use crate::headline::RawHeadline;
use crate::story::{sort_groups_by_heat, DeduplicationGroup};

use super::prompts;
use super::topic::{fallback_topic, sanitize_topic};

/// Two topic labels this close (normalized Levenshtein, case-folded) are
/// the same story phrased twice; their groups merge.
const TOPIC_MERGE_THRESHOLD: f64 = 0.9;

#[derive(Deserialize)]
struct GroupingResponse {
    #[serde(default)]
    groups: Vec<TopicGroupRaw>,
}

#[derive(Deserialize)]
struct TopicGroupRaw {
    #[serde(default)]
    topic: String,
    #[serde(default, rename = "memberIndices")]
    member_indices: Vec<usize>,
}

/// Partition a batch with one topic-grouping generation call.
///
/// The response is validated strictly at this boundary: out-of-range and
/// double-claimed indices are dropped, unassigned headlines become
/// singleton groups, and near-duplicate topic labels merge. A failed call
/// or unparsable response means no groups exist for the batch, so the
/// failure is surfaced rather than isolated.
pub async fn group_by_topic(
    mut headlines: Vec<RawHeadline>,
    generator: &dyn GenerationClient,
) -> Result<Vec<DeduplicationGroup>> {
    if headlines.is_empty() {
        return Ok(Vec::new());
    }

    for h in headlines.iter_mut() {
        h.normalize();
    }

    let request = GenerationRequest::new(
        prompts::grouping_system(),
        prompts::grouping_user(&headlines),
        prompts::grouping_max_tokens(headlines.len()),
    );
    let raw = generator.generate(&request).await?;

    let parsed: GroupingResponse = serde_json::from_str(strip_code_fences(&raw))
        .map_err(|e| PipelineError::GenerationFailed(format!("unparsable grouping response: {e}")))?;

    let repaired = repair_assignments(parsed.groups, headlines.len());
    let merged = merge_similar_topics(repaired);

    let now = Utc::now();
    let mut groups: Vec<DeduplicationGroup> = Vec::with_capacity(merged.len());
    for (raw_topic, indices) in merged {
        let members: Vec<RawHeadline> = indices.iter().map(|&i| headlines[i].clone()).collect();
        let label = sanitize_topic(&raw_topic);
        let label = if label.is_empty() {
            fallback_topic(&members[0])
        } else {
            label
        };
        groups.push(assemble_group(label, members, now));
    }
    sort_groups_by_heat(&mut groups);

    tracing::info!(
        headlines = headlines.len(),
        groups = groups.len(),
        "topic grouping complete"
    );
    Ok(groups)
}

/// Keep only usable index claims: in range, first claim wins. Member lists
/// are re-sorted into input order. Headlines the model never placed come
/// back as singleton groups (empty topic, filled in later).
fn repair_assignments(parsed: Vec<TopicGroupRaw>, batch_len: usize) -> Vec<(String, Vec<usize>)> {
    let mut claimed = vec![false; batch_len];
    let mut out: Vec<(String, Vec<usize>)> = Vec::new();
    for group in parsed {
        let mut members = Vec::new();
        for idx in group.member_indices {
            if idx >= batch_len {
                tracing::warn!(index = idx, batch_len, "grouping referenced a headline outside the batch, dropping index");
                continue;
            }
            if claimed[idx] {
                tracing::warn!(index = idx, "grouping claimed a headline twice, keeping the first claim");
                continue;
            }
            claimed[idx] = true;
            members.push(idx);
        }
        if members.is_empty() {
            continue;
        }
        members.sort_unstable();
        out.push((group.topic, members));
    }

    let unassigned: Vec<usize> = claimed
        .iter()
        .enumerate()
        .filter(|(_, &c)| !c)
        .map(|(i, _)| i)
        .collect();
    if !unassigned.is_empty() {
        tracing::warn!(
            count = unassigned.len(),
            "grouping left headlines unassigned, emitting singletons"
        );
        for idx in unassigned {
            out.push((String::new(), vec![idx]));
        }
    }
    out
}

/// Merge groups whose labels are near-identical, first-seen group wins the
/// label. Unlabeled (fallback) groups never merge.
fn merge_similar_topics(groups: Vec<(String, Vec<usize>)>) -> Vec<(String, Vec<usize>)> {
    let mut out: Vec<(String, Vec<usize>)> = Vec::new();
    for (topic, members) in groups {
        let target = out.iter_mut().find(|(existing, _)| {
            !existing.is_empty()
                && !topic.is_empty()
                && strsim::normalized_levenshtein(&existing.to_lowercase(), &topic.to_lowercase())
                    >= TOPIC_MERGE_THRESHOLD
        });
        match target {
            Some((existing, existing_members)) => {
                tracing::debug!(kept = %existing, dropped = %topic, "merging near-duplicate topic labels");
                existing_members.extend(members);
                existing_members.sort_unstable();
            }
            None => out.push((topic, members)),
        }
    }
    out
}
