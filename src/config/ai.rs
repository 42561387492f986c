// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_embed_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" | "claude" (case-insensitive; claude is stubbed)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY / CLAUDE_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    /// Guided-generation model.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model; its dimensionality comes from pipeline config.
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    /// Sampling temperature for generation calls. Sanitized to 0.0–2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound for a single generation call. Sanitized to 64–4096.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            model: default_model(),
            embed_model: default_embed_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                "claude" => env::var("CLAUDE_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing CLAUDE_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        // Sanitize numeric bands
        if !(0.0..=2.0).contains(&cfg.temperature) || !cfg.temperature.is_finite() {
            cfg.temperature = default_temperature();
        }
        if cfg.max_output_tokens < 64 || cfg.max_output_tokens > 4096 {
            cfg.max_output_tokens = default_max_output_tokens();
        }

        Ok(cfg)
    }

    /// Boot-time loader: a missing or unreadable file degrades to the
    /// disabled default instead of failing the service.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "AI config unavailable, generation disabled"
                );
                Self::default()
            }
        }
    }
}
