// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod compile;
pub mod config;
pub mod dedup;
pub mod embed;
pub mod error;
pub mod generate;
pub mod headline;
pub mod metrics;
pub mod storage;
pub mod story;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::compile::{
    compile_group, compile_groups, compile_headlines, CompileOutcome, GroupingStrategy, StylePrefs,
};
pub use crate::config::{AiConfig, PipelineConfig};
pub use crate::dedup::run_pass;
pub use crate::error::{PipelineError, Result};
pub use crate::headline::RawHeadline;
pub use crate::story::{CompiledItem, DeduplicationGroup};

use tracing::{info, warn};

/// Call this from your Shuttle entrypoint (after tracing init) to perform a
/// one-off smoke test of the generation client. It won't panic on failure; it
/// just logs the result, so a service with generation disabled still boots.
pub async fn run_generation_quick_probe(client: &dyn generate::GenerationClient) {
    let request = generate::GenerationRequest::new(
        "Reply with the single word: ready.",
        "Readiness check.",
        8,
    );
    match client.generate(&request).await {
        Ok(answer) => info!(
            provider = client.provider_name(),
            answer = answer.trim(),
            "generation quick probe ok"
        ),
        Err(err) => warn!(
            provider = client.provider_name(),
            error = %err,
            "generation quick probe failed"
        ),
    }
}
