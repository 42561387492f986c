// src/generate/adapter.rs
//! Guided-generation adapter: provider abstraction + per-call deadline.
//! Callers build a [`GenerationRequest`] (prompt text, token budget) and get
//! back plain text or a typed failure; which model answered is a wiring
//! decision made once at boot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;
use crate::error::{PipelineError, Result};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One guided-generation call: a fixed directive plus the material to work
/// from. The token budget caps the answer, not the input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens,
        }
    }
}

/// Trait object used by the pipeline (compiler/labeler/regeneration) and by
/// tests.
pub trait GenerationClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Provider name for diagnostics/headers.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerationClient = Arc<dyn GenerationClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if `config.enabled==false`, returns a disabled client.
/// * Else builds the real provider (OpenAI) wrapped with the per-call
///   deadline.
pub fn build_client_from_config(config: &AiConfig, timeout_secs: u64) -> DynGenerationClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: "Mock generated text.".to_string(),
        };
        return Arc::new(TimedClient::new(mock, Duration::from_secs(timeout_secs)));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(config);
            Arc::new(TimedClient::new(
                provider,
                Duration::from_secs(timeout_secs),
            ))
        }
        // Stub: return disabled until implemented.
        "claude" => Arc::new(DisabledClient),
        _ => Arc::new(DisabledClient),
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so the deadline
/// wrapper applies uniformly to production and test providers.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("story-compiler/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(PipelineError::GenerationFailed(
                    "no API key configured".to_string(),
                ));
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: &request.system,
                    },
                    Msg {
                        role: "user",
                        content: &request.user,
                    },
                ],
                temperature: self.temperature,
                max_tokens: request.max_tokens.min(self.max_output_tokens),
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| PipelineError::GenerationFailed(format!("request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                return Err(PipelineError::GenerationFailed(format!(
                    "provider returned {status}: {snippet}"
                )));
            }

            let body: Resp = resp
                .json()
                .await
                .map_err(|e| PipelineError::GenerationFailed(format!("bad response body: {e}")))?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.trim())
                .unwrap_or("");
            if content.is_empty() {
                return Err(PipelineError::GenerationFailed(
                    "model returned no content".to_string(),
                ));
            }
            Ok(content.to_string())
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Fails every call; used when generation is switched off. Topic labeling
/// still works (title fallback) and batch compiles degrade to skips.
pub struct DisabledClient;

impl GenerationClient for DisabledClient {
    fn generate<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async {
            Err(PipelineError::GenerationFailed(
                "generation disabled".to_string(),
            ))
        })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Simple mock provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Deadline wrapper
// ------------------------------------------------------------

/// Applies one deadline per call and maps elapsed time to the timeout
/// failure kind. Everything above this wrapper treats a timeout exactly
/// like any other failed call.
pub struct TimedClient<P: Provider> {
    inner: P,
    timeout: Duration,
}

impl<P: Provider> TimedClient<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<P: Provider> GenerationClient for TimedClient<P> {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.inner.fetch(request)).await {
                Ok(result) => result,
                Err(_) => {
                    counter!("generation_timeouts_total").increment(1);
                    Err(PipelineError::GenerationTimeout(self.timeout.as_secs()))
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Output hygiene
// ------------------------------------------------------------

/// Force model output onto a single whitespace-collapsed line, capped at
/// `max_chars` characters.
pub fn sanitize_single_line(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars * 4));
    let mut prev_space = false;
    let mut chars = 0usize;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c => c,
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                chars += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            chars += 1;
            prev_space = false;
        }
        if chars >= max_chars {
            break;
        }
    }
    out.trim().to_string()
}

/// Strip a surrounding markdown code fence (with or without an info string)
/// from model output. Text without a fence passes through trimmed.
pub fn strip_code_fences(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
