// src/config/pipeline.rs
//! Pipeline tunables: TOML file, environment overrides, clamped values.
//! Loaded once at boot and passed into pipeline calls as plain parameters;
//! nothing in the pipeline reads ambient state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";

pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_SIMILARITY_THRESHOLD: &str = "PIPELINE_SIMILARITY_THRESHOLD";
pub const ENV_GENERATION_TIMEOUT_SECS: &str = "PIPELINE_GENERATION_TIMEOUT_SECS";
pub const ENV_EMBED_DIMENSION: &str = "PIPELINE_EMBED_DIMENSION";

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;
pub const DEFAULT_EMBED_DIMENSION: usize = 1536;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 45;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cosine similarity needed to join a group's seed; must stay in (0, 1].
    pub similarity_threshold: f32,
    /// Vector length shared by the embedding backend and its fallback.
    pub embed_dimension: usize,
    /// Per-call deadline for guided generation.
    pub generation_timeout_secs: u64,
    /// Optional house style applied when a request does not specify one.
    pub default_tone: Option<String>,
    pub default_format: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embed_dimension: DEFAULT_EMBED_DIMENSION,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            default_tone: None,
            default_format: None,
        }
    }
}

impl PipelineConfig {
    /// Boot loader: `$PIPELINE_CONFIG_PATH`, then `config/pipeline.toml`,
    /// then built-in defaults. Env overrides and sanitation apply on top.
    pub fn load() -> Self {
        let path = std::env::var(ENV_PIPELINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH));
        let mut cfg = match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "pipeline config unavailable, using defaults");
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        cfg
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: PipelineConfig = toml::from_str(&content)?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_env_f32(ENV_SIMILARITY_THRESHOLD) {
            self.similarity_threshold = t;
        }
        if let Some(secs) = parse_env_u64(ENV_GENERATION_TIMEOUT_SECS) {
            self.generation_timeout_secs = secs;
        }
        if let Some(dim) = parse_env_u64(ENV_EMBED_DIMENSION) {
            self.embed_dimension = dim as usize;
        }
    }

    /// Out-of-range values fall back to defaults (threshold) or clamp
    /// (dimension, timeout). Empty tone/format strings collapse to `None`.
    pub fn sanitize(&mut self) {
        let t = self.similarity_threshold;
        if !(t.is_finite() && t > 0.0 && t <= 1.0) {
            tracing::warn!(threshold = t, "invalid similarity threshold, using default");
            self.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        self.embed_dimension = self.embed_dimension.clamp(8, 4096);
        self.generation_timeout_secs = self.generation_timeout_secs.clamp(1, 300);
        if matches!(self.default_tone.as_deref(), Some(s) if s.trim().is_empty()) {
            self.default_tone = None;
        }
        if matches!(self.default_format.as_deref(), Some(s) if s.trim().is_empty()) {
            self.default_format = None;
        }
    }
}

fn parse_env_f32(name: &str) -> Option<f32> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<f32>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
