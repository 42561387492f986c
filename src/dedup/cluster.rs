// src/dedup/cluster.rs
//! Greedy seed-linkage clustering over precomputed embeddings. Pure and
//! index-based: callers keep ownership of headlines and embeddings, this
//! module only decides who goes with whom.

use crate::embed::{cosine_similarity, Embedding};
use crate::error::{PipelineError, Result};

/// Reject thresholds outside `(0, 1]` before any work happens. NaN and
/// infinities are invalid too.
pub fn validate_threshold(threshold: f32) -> Result<()> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidThreshold(threshold))
    }
}

/// Single-pass clustering in input order. Each vector is compared against
/// the seed (first member) of every existing cluster, oldest cluster first,
/// and joins the first one whose seed clears the threshold; otherwise it
/// seeds a new cluster.
///
/// Comparing seeds only keeps a run O(n * clusters) and makes membership
/// depend on the seed alone: if B joined A's cluster, a later C close to B
/// but not to A still starts its own cluster. Chains do not grow clusters
/// transitively, and results are deterministic for a given input order.
pub fn cluster_by_similarity(embeddings: &[Embedding], threshold: f32) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (idx, emb) in embeddings.iter().enumerate() {
        let joined = clusters.iter_mut().find(|cluster| {
            let seed = cluster[0];
            cosine_similarity(emb, &embeddings[seed]) >= threshold
        });
        match joined {
            Some(cluster) => cluster.push(idx),
            None => clusters.push(vec![idx]),
        }
    }
    clusters
}
