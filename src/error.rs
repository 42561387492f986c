//! Pipeline failure kinds.
//!
//! Only failures a caller can act on are surfaced. Embedding outages are
//! recovered inside the embedder (deterministic fallback) and never appear
//! here; topic-labeling failures collapse to a title-derived label.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Similarity threshold outside `(0, 1]`. Rejected before any work.
    #[error("similarity threshold {0} is outside (0, 1]")]
    InvalidThreshold(f32),

    /// The embedding backend failed and no fallback was configured. The
    /// standard wiring pairs every remote backend with the deterministic
    /// fallback, which recovers before this can surface.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A guided-generation call failed. For whole-batch compiles this is
    /// handled per group (skip and continue); it reaches the caller only
    /// when the failure affects the entire call (regeneration, topic
    /// grouping).
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// A guided-generation call exceeded its deadline. Treated exactly like
    /// `GenerationFailed` everywhere; kept separate for diagnostics.
    #[error("generation timed out after {0}s")]
    GenerationTimeout(u64),

    /// Regeneration referenced an item the store does not know.
    #[error("compiled item not found: {0}")]
    ItemNotFound(String),

    /// Regeneration could not re-derive any source headlines for an item.
    #[error("no source headlines available for item {0}")]
    MissingProvenance(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// True for the failure kinds that batch compiles isolate per group.
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            PipelineError::GenerationFailed(_) | PipelineError::GenerationTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_counts_as_generation_failure() {
        assert!(PipelineError::GenerationTimeout(10).is_generation());
        assert!(PipelineError::GenerationFailed("boom".into()).is_generation());
        assert!(!PipelineError::InvalidThreshold(1.5).is_generation());
    }

    #[test]
    fn display_names_the_threshold() {
        let e = PipelineError::InvalidThreshold(0.0);
        assert!(e.to_string().contains("0"));
        assert!(e.to_string().contains("(0, 1]"));
    }
}
