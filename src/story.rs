// src/story.rs
//! Story-level types: the ephemeral deduplication group produced by a pass
//! and the persisted compiled item handed to downstream collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::headline::RawHeadline;

/// One similarity group from a deduplication pass. Ephemeral: only its
/// effects (headline annotations, compiled items) survive the pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationGroup {
    /// Freshly generated per pass; never reused across passes.
    pub group_id: Uuid,
    /// Short human-readable label, always non-empty (the labeler falls
    /// back to title tokens rather than failing).
    pub topic: String,
    /// Non-empty, ordered; every batch headline lands in exactly one group.
    pub members: Vec<RawHeadline>,
    /// The "best version" member standing in for the whole group.
    pub representative_id: String,
    /// Count of independent reports of this story, fixed at creation.
    pub heat_score: u32,
}

impl DeduplicationGroup {
    /// Build a group from its members and the index of the representative.
    /// Heat is the member count at creation time and is never recomputed.
    pub fn new(topic: impl Into<String>, members: Vec<RawHeadline>, representative_idx: usize) -> Self {
        debug_assert!(!members.is_empty(), "group must have members");
        debug_assert!(representative_idx < members.len());
        let heat_score = members.len() as u32;
        let representative_id = members[representative_idx].id.clone();
        Self {
            group_id: Uuid::new_v4(),
            topic: topic.into(),
            members,
            representative_id,
            heat_score,
        }
    }

    /// The representative member. The constructor guarantees membership.
    pub fn representative(&self) -> &RawHeadline {
        self.members
            .iter()
            .find(|m| m.id == self.representative_id)
            .unwrap_or(&self.members[0])
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

/// Persisted output of compiling one group (or one externally supplied
/// headline subset). Created once; afterwards only `hook`/`summary` change,
/// through the regeneration adapter, plus the user-facing `is_selected`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledItem {
    pub id: String,
    pub topic: String,
    /// 1–2 sentence attention hook. Empty string marks a failed hook call
    /// on an otherwise-usable item.
    pub hook: String,
    /// Multi-paragraph standalone narrative. Same empty-marker convention.
    pub summary: String,
    /// Originating headline ids, ordered; never empty.
    pub source_headline_ids: Vec<String>,
    /// Carried over from the group; 1 when the item was not produced by a
    /// dedup pass.
    pub heat_score: u32,
    #[serde(default)]
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

impl CompiledItem {
    pub fn new(
        topic: impl Into<String>,
        hook: impl Into<String>,
        summary: impl Into<String>,
        source_headline_ids: Vec<String>,
        heat_score: u32,
    ) -> Self {
        debug_assert!(
            !source_headline_ids.is_empty(),
            "compiled item needs provenance"
        );
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            hook: hook.into(),
            summary: summary.into(),
            source_headline_ids,
            heat_score: heat_score.max(1),
            is_selected: false,
            created_at: Utc::now(),
        }
    }
}

/// Sort groups for display priority: heat descending, ties keep the order
/// the groups were seeded in (std stable sort).
pub fn sort_groups_by_heat(groups: &mut [DeduplicationGroup]) {
    groups.sort_by(|a, b| b.heat_score.cmp(&a.heat_score));
}

/// Same policy for compiled items: most broadly covered stories first,
/// independent of generation completion order.
pub fn sort_items_by_heat(items: &mut [CompiledItem]) {
    items.sort_by(|a, b| b.heat_score.cmp(&a.heat_score));
}
