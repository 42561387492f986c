use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize Prometheus recorder and expose a static gauge for the
    /// configured similarity threshold.
    pub fn init(similarity_threshold: f32) -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("dedup_similarity_threshold").set(similarity_threshold as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_pipeline_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "dedup_headlines_total",
            "Headlines accepted into deduplication passes."
        );
        describe_counter!("dedup_groups_total", "Groups produced by deduplication passes.");
        describe_counter!(
            "dedup_singletons_total",
            "Size-1 groups produced by deduplication passes."
        );
        describe_counter!(
            "embed_fallback_total",
            "Embeddings served by the deterministic fallback."
        );
        describe_counter!(
            "compile_items_total",
            "Compiled items produced (including partial items)."
        );
        describe_counter!(
            "compile_partial_total",
            "Compiled items with one failed generation side."
        );
        describe_counter!(
            "compile_skipped_total",
            "Groups skipped because both generation calls failed."
        );
        describe_counter!(
            "generation_failures_total",
            "Failed guided-generation calls (timeouts included)."
        );
        describe_counter!(
            "generation_timeouts_total",
            "Guided-generation calls that hit their deadline."
        );
        describe_counter!(
            "regenerate_total",
            "Regeneration attempts (success or failure)."
        );
        describe_histogram!("dedup_pass_ms", "Deduplication pass time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when a pipeline pass last completed."
        );
    });
}
