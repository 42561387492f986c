// src/embed/openai.rs
//! Remote embedding backend over the OpenAI `/v1/embeddings` endpoint.
//! Batch input goes up as one request; the response is re-ordered by the
//! returned `index` field before use.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Embedding, TextEmbedder};

const ENV_BASE_URL: &str = "STORY_OPENAI_BASE_URL";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, model: &str, dimension: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("story-compiler/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let base_url =
            std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
            base_url,
        }
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Embedding>> {
        #[derive(Serialize)]
        struct EmbeddingsRequest<'a> {
            model: &'a str,
            input: &'a [String],
            dimensions: usize,
        }

        #[derive(Deserialize)]
        struct EmbeddingsResponse {
            data: Vec<EmbeddingRow>,
        }

        #[derive(Deserialize)]
        struct EmbeddingRow {
            index: usize,
            embedding: Vec<f32>,
        }

        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = EmbeddingsRequest {
            model: &self.model,
            input,
            dimensions: self.dimension,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("embeddings request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            bail!("embeddings endpoint returned {status}: {snippet}");
        }

        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .context("embeddings response was not valid JSON")?;
        if parsed.data.len() != input.len() {
            bail!(
                "embeddings count mismatch: sent {}, got {}",
                input.len(),
                parsed.data.len()
            );
        }

        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if row.embedding.len() != self.dimension {
                bail!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    row.embedding.len()
                );
            }
            out.push(row.embedding);
        }
        Ok(out)
    }
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let input = [text.to_string()];
        let mut batch = self.request(&input).await?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embeddings response was empty"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
