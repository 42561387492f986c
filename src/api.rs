use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::compile::{self, CompileOutcome, GroupingStrategy, StylePrefs};
use crate::config::{AiConfig, PipelineConfig};
use crate::dedup;
use crate::embed::{build_embedder, TextEmbedder};
use crate::error::PipelineError;
use crate::generate::{build_client_from_config, DynGenerationClient};
use crate::headline::RawHeadline;
use crate::storage::{MemoryStore, PipelineStore};
use crate::story::{CompiledItem, DeduplicationGroup};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PipelineStore>,
    pub embedder: Arc<dyn TextEmbedder>,
    pub generator: DynGenerationClient,
    pub config: Arc<PipelineConfig>,
}

impl AppState {
    /// Production wiring: backends picked from config, in-memory store.
    pub fn build(config: PipelineConfig, ai: &AiConfig) -> Self {
        let embedder = build_embedder(ai, config.embed_dimension);
        let generator = build_client_from_config(ai, config.generation_timeout_secs);
        Self {
            store: Arc::new(MemoryStore::new()),
            embedder,
            generator,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dedupe", post(dedupe))
        .route("/compile", post(compile_batch))
        .route("/regenerate", post(regenerate))
        .route("/items", get(list_items))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Pipeline failures mapped onto the wire. Isolated per-group failures
/// never reach this; they are folded into the batch response.
struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(PipelineError::Storage(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidThreshold(_) => StatusCode::BAD_REQUEST,
            PipelineError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::MissingProvenance(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::GenerationFailed(_) | PipelineError::GenerationTimeout(_) => {
                StatusCode::BAD_GATEWAY
            }
            PipelineError::EmbeddingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(serde::Deserialize)]
struct DedupeReq {
    headlines: Vec<RawHeadline>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[derive(serde::Serialize)]
struct GroupSummary {
    group_id: Uuid,
    topic: String,
    heat_score: u32,
    representative_id: String,
    member_ids: Vec<String>,
}

impl From<&DeduplicationGroup> for GroupSummary {
    fn from(g: &DeduplicationGroup) -> Self {
        Self {
            group_id: g.group_id,
            topic: g.topic.clone(),
            heat_score: g.heat_score,
            representative_id: g.representative_id.clone(),
            member_ids: g.member_ids(),
        }
    }
}

#[derive(serde::Serialize)]
struct DedupeResp {
    headlines: usize,
    groups: Vec<GroupSummary>,
}

async fn dedupe(
    State(state): State<AppState>,
    Json(body): Json<DedupeReq>,
) -> Result<Json<DedupeResp>, ApiError> {
    let threshold = body.threshold.unwrap_or(state.config.similarity_threshold);
    let headline_count = body.headlines.len();

    let groups = dedup::run_pass(
        body.headlines,
        threshold,
        state.embedder.as_ref(),
        state.generator.as_ref(),
    )
    .await?;

    for group in &groups {
        state.store.annotate_headlines(&group.members).await?;
    }

    Ok(Json(DedupeResp {
        headlines: headline_count,
        groups: groups.iter().map(GroupSummary::from).collect(),
    }))
}

#[derive(serde::Deserialize)]
struct CompileReq {
    headlines: Vec<RawHeadline>,
    #[serde(default)]
    threshold: Option<f32>,
    #[serde(default)]
    strategy: Option<GroupingStrategy>,
    #[serde(default)]
    tone: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(serde::Serialize)]
struct CompileResp {
    groups: usize,
    skipped: usize,
    items: Vec<CompiledItem>,
}

async fn compile_batch(
    State(state): State<AppState>,
    Json(body): Json<CompileReq>,
) -> Result<Json<CompileResp>, ApiError> {
    let threshold = body.threshold.unwrap_or(state.config.similarity_threshold);
    let strategy = body.strategy.unwrap_or_default();
    let prefs = StylePrefs {
        tone: body.tone.or_else(|| state.config.default_tone.clone()),
        format: body.format.or_else(|| state.config.default_format.clone()),
    };

    let (groups, outcome): (Vec<DeduplicationGroup>, CompileOutcome) = compile::compile_headlines(
        body.headlines,
        strategy,
        threshold,
        &prefs,
        state.embedder.as_ref(),
        state.generator.as_ref(),
    )
    .await?;

    for group in &groups {
        state.store.annotate_headlines(&group.members).await?;
    }
    state.store.insert_items(&outcome.items).await?;

    Ok(Json(CompileResp {
        groups: groups.len(),
        skipped: outcome.skipped,
        items: outcome.items,
    }))
}

#[derive(serde::Deserialize)]
struct RegenerateReq {
    item_id: String,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    tone: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

async fn regenerate(
    State(state): State<AppState>,
    Json(body): Json<RegenerateReq>,
) -> Result<Json<CompiledItem>, ApiError> {
    let prefs = StylePrefs {
        tone: body.tone.or_else(|| state.config.default_tone.clone()),
        format: body.format.or_else(|| state.config.default_format.clone()),
    };
    let item = compile::regenerate::regenerate_item(
        &body.item_id,
        body.instructions.as_deref(),
        &prefs,
        state.store.as_ref(),
        state.generator.as_ref(),
    )
    .await?;
    Ok(Json(item))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<CompiledItem>>, ApiError> {
    let items = state.store.list_items().await?;
    Ok(Json(items))
}
