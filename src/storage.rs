// src/storage.rs
//! Storage boundary. The pipeline only ever writes headline annotations,
//! inserts compiled items, and updates hook/summary text; there are no
//! delete operations. Engine choice lives behind this trait.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::headline::RawHeadline;
use crate::story::{sort_items_by_heat, CompiledItem};

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Accept collected headlines, keyed by id. Re-sending an id replaces
    /// the stored copy.
    async fn upsert_headlines(&self, headlines: &[RawHeadline]) -> Result<()>;

    /// Persist the annotations a deduplication pass wrote on these members
    /// (`dedup_group_id`, `heat_score`, `is_best_version`).
    async fn annotate_headlines(&self, headlines: &[RawHeadline]) -> Result<()>;

    async fn insert_items(&self, items: &[CompiledItem]) -> Result<()>;

    /// Overwrite exactly the hook and summary of an existing item.
    async fn update_item_content(&self, item_id: &str, hook: &str, summary: &str) -> Result<()>;

    async fn get_item(&self, item_id: &str) -> Result<Option<CompiledItem>>;

    /// Fetch headlines in the order of `ids`; unknown ids are skipped.
    async fn headlines_by_ids(&self, ids: &[String]) -> Result<Vec<RawHeadline>>;

    /// All stored items, heat-descending (insertion order breaks ties).
    async fn list_items(&self) -> Result<Vec<CompiledItem>>;
}

/// In-memory store backing tests, the demo binary, and single-instance
/// deployments without a database attached.
#[derive(Default)]
pub struct MemoryStore {
    headlines: Mutex<HashMap<String, RawHeadline>>,
    items: Mutex<Vec<CompiledItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn upsert_headlines(&self, headlines: &[RawHeadline]) -> Result<()> {
        let mut guard = self.headlines.lock().expect("poisoned headline store");
        for h in headlines {
            guard.insert(h.id.clone(), h.clone());
        }
        Ok(())
    }

    async fn annotate_headlines(&self, headlines: &[RawHeadline]) -> Result<()> {
        let mut guard = self.headlines.lock().expect("poisoned headline store");
        for h in headlines {
            guard.insert(h.id.clone(), h.clone());
        }
        Ok(())
    }

    async fn insert_items(&self, items: &[CompiledItem]) -> Result<()> {
        let mut guard = self.items.lock().expect("poisoned item store");
        guard.extend(items.iter().cloned());
        Ok(())
    }

    async fn update_item_content(&self, item_id: &str, hook: &str, summary: &str) -> Result<()> {
        let mut guard = self.items.lock().expect("poisoned item store");
        match guard.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.hook = hook.to_string();
                item.summary = summary.to_string();
                Ok(())
            }
            None => anyhow::bail!("unknown item id: {item_id}"),
        }
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<CompiledItem>> {
        let guard = self.items.lock().expect("poisoned item store");
        Ok(guard.iter().find(|i| i.id == item_id).cloned())
    }

    async fn headlines_by_ids(&self, ids: &[String]) -> Result<Vec<RawHeadline>> {
        let guard = self.headlines.lock().expect("poisoned headline store");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn list_items(&self) -> Result<Vec<CompiledItem>> {
        let guard = self.items.lock().expect("poisoned item store");
        let mut items = guard.clone();
        sort_items_by_heat(&mut items);
        Ok(items)
    }
}
