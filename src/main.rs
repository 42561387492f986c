//! Story Compiler Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart and endpoint examples.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use story_compiler::api::{create_router, AppState};
use story_compiler::config::ai::DEFAULT_AI_CONFIG_PATH;
use story_compiler::config::{AiConfig, PipelineConfig};
use story_compiler::metrics::Metrics;
use story_compiler::run_generation_quick_probe;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PIPELINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PIPELINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("story_compiler=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables PIPELINE_SIMILARITY_THRESHOLD and friends from .env
    // so config/pipeline.rs can pick them up.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // Config first: the threshold gauge and the embedder both need it.
    let config = PipelineConfig::load();
    let ai = AiConfig::load_or_default(DEFAULT_AI_CONFIG_PATH);

    // Install the Prometheus recorder before any pipeline counters fire.
    let metrics = Metrics::init(config.similarity_threshold);

    let state = AppState::build(config, &ai);

    // One-off smoke test of the generation backend; logs only, never aborts boot.
    run_generation_quick_probe(state.generator.as_ref()).await;

    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
