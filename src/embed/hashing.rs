// src/embed/hashing.rs
//! Deterministic feature-hashing embedder. No network, no model weights:
//! tokens are hashed into signed buckets and the vector is L2-normalized,
//! so near-duplicate headlines (shared tokens) still land close in cosine
//! space. Same input, same vector, on every run and every machine.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{l2_normalize, Embedding, TextEmbedder};

const HASH_SEED: &[u8] = b"story-compiler/embed/v1";

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_sync(&self, text: &str) -> Embedding {
        let mut v = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);
        for token in &tokens {
            self.bump(&mut v, token);
        }
        // Adjacent-token bigrams keep "fed cuts" apart from "fed holds".
        for pair in tokens.windows(2) {
            let bigram = format!("{}_{}", pair[0], pair[1]);
            self.bump(&mut v, &bigram);
        }
        l2_normalize(&mut v);
        v
    }

    fn bump(&self, v: &mut [f32], feature: &str) {
        let mut hasher = Sha256::new();
        hasher.update(HASH_SEED);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let mut idx_bytes = [0u8; 8];
        idx_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_be_bytes(idx_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}
