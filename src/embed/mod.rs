// src/embed/mod.rs
//! Text embedding seam: one trait, two implementations (remote model,
//! deterministic hash fallback), and a wrapper that fails over so a remote
//! outage degrades clustering instead of stopping the run.

pub mod hashing;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;

use crate::config::ai::AiConfig;

pub use crate::embed::hashing::HashingEmbedder;
pub use crate::embed::openai::OpenAiEmbedder;

/// Fixed-length semantic vector, attached transiently to a headline during
/// one clustering pass.
pub type Embedding = Vec<f32>;

#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed one UTF-8 string into a normalized fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch. Backends override this when the remote API accepts
    /// array input; the default fans out per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        futures::future::try_join_all(texts.iter().map(|t| self.embed(t))).await
    }

    fn dimension(&self) -> usize;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Cosine similarity in `[-1, 1]`. Zero-norm vectors compare as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Scale a vector to unit L2 norm in place. Zero vectors stay zero.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Failover wrapper: try the remote backend, recover locally on any error.
/// The fallback is constructed with the primary's dimensionality so vectors
/// from either side are comparable within one pass.
pub struct FallbackEmbedder {
    primary: Box<dyn TextEmbedder>,
    fallback: HashingEmbedder,
}

impl FallbackEmbedder {
    pub fn new(primary: Box<dyn TextEmbedder>) -> Self {
        let fallback = HashingEmbedder::new(primary.dimension());
        Self { primary, fallback }
    }
}

#[async_trait]
impl TextEmbedder for FallbackEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        match self.primary.embed(text).await {
            Ok(v) => Ok(v),
            Err(e) => {
                counter!("embed_fallback_total").increment(1);
                tracing::warn!(error = ?e, backend = self.primary.name(), "embedding backend failed, using hash fallback");
                self.fallback.embed(text).await
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        match self.primary.embed_batch(texts).await {
            Ok(v) => Ok(v),
            Err(e) => {
                counter!("embed_fallback_total").increment(texts.len() as u64);
                tracing::warn!(error = ?e, backend = self.primary.name(), count = texts.len(), "batch embedding failed, using hash fallback");
                self.fallback.embed_batch(texts).await
            }
        }
    }

    fn dimension(&self) -> usize {
        self.primary.dimension()
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Factory: pick the embedding backend by availability, not by call site.
/// With a configured remote model the hash embedder still rides along as
/// the failover; without one it is the whole backend.
pub fn build_embedder(cfg: &AiConfig, dimension: usize) -> Arc<dyn TextEmbedder> {
    if cfg.enabled && !cfg.api_key.is_empty() {
        let remote = OpenAiEmbedder::new(&cfg.api_key, &cfg.embed_model, dimension);
        Arc::new(FallbackEmbedder::new(Box::new(remote)))
    } else {
        tracing::info!(dimension, "no embedding backend configured, using deterministic hash embedder");
        Arc::new(HashingEmbedder::new(dimension))
    }
}
