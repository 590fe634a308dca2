//! HTTP embedding provider.
//!
//! Talks to an OpenAI-compatible `/embeddings` endpoint serving a
//! CLIP-family model that embeds text and images into one space. Image
//! inputs are sent as base64 data URLs.

use super::traits::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::search::types::FrameContent;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default request timeout for the embedding service.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding provider backed by a remote HTTP service.
///
/// The service owns the model lifecycle; this client is cheap to clone and
/// holds no per-request state.
#[derive(Debug, Clone)]
pub struct RemoteEncoder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

impl RemoteEncoder {
    /// Creates an encoder for the service at `base_url` (no trailing slash),
    /// requesting `model` and expecting `dimension`-length vectors.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        }
    }

    async fn encode_input(&self, input: String) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![input],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    EmbeddingError::Unreachable(e.to_string())
                } else {
                    EmbeddingError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed(format!(
                "{status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| {
                EmbeddingError::InvalidResponse("empty data array".to_string())
            })?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        debug!(dim = embedding.len(), "received embedding");
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEncoder {
    fn embedding_dim(&self) -> usize {
        self.dimension
    }

    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encode_input(text.to_string()).await
    }

    async fn encode_content(&self, content: &FrameContent) -> Result<Vec<f32>, EmbeddingError> {
        let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(&content.bytes));
        self.encode_input(data_url).await
    }
}
