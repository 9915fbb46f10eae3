//! Embedding Clients
//!
//! Thin wrappers over external text-embedding services. Each client turns one
//! piece of text into a fixed-length `f32` vector; the dimensionality is
//! decided by the remote model.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::CreateEmbeddingRequestArgs,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Base URL of the Hugging Face serverless inference router.
pub const HUGGINGFACE_BASE_URL: &str = "https://router.huggingface.co/hf-inference";

/// Per-request timeout of the Hugging Face HTTP client unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding generation errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("OpenAI-compatible API error: {0}")]
    OpenAI(#[from] OpenAIError),

    #[error("Embedding service returned an empty vector")]
    EmptyEmbedding,

    #[error("Embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Abstraction over embedding providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

// --- OpenAI-compatible ---

/// Embeddings through any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbeddingClient {
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text.to_string())
            .build()?;

        let response = self.client.embeddings().create(request).await?;
        let vector = response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        Ok(vector)
    }
}

// --- Hugging Face feature extraction ---

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// Sentence-transformer models answer with one vector, plain encoders with
/// one vector per token.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Sentence(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

#[derive(Debug, Deserialize)]
struct HuggingFaceErrorResponse {
    error: String,
}

/// Embeddings through the Hugging Face inference `feature-extraction` pipeline.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbeddingClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl HuggingFaceEmbeddingClient {
    pub fn new(api_key: Option<String>, model: String) -> Result<Self, EmbeddingError> {
        Self::with_base_url(api_key, model, HUGGINGFACE_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (self-hosted inference, tests).
    pub fn with_base_url(
        api_key: Option<String>,
        model: String,
        base_url: String,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT)?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Replaces the HTTP client with one using `timeout` per request.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EmbeddingError> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, EmbeddingError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.base_url, self.model
        );

        let mut request = self
            .client
            .post(&url)
            .json(&FeatureExtractionRequest { inputs: text });
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<HuggingFaceErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            tracing::error!(code = status.as_u16(), message = %message, "Hugging Face API error");
            return Err(EmbeddingError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let vector = match response.json::<FeatureExtractionResponse>().await? {
            FeatureExtractionResponse::Sentence(v) => v,
            FeatureExtractionResponse::Tokens(tokens) => mean_pool(&tokens),
            FeatureExtractionResponse::Batched(batch) => batch
                .first()
                .map(|tokens| mean_pool(tokens))
                .unwrap_or_default(),
        };

        if vector.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        Ok(vector)
    }
}

/// Averages token vectors into one sentence vector.
fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = tokens.first() else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; first.len()];
    for token in tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    pooled
}
