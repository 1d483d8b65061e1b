// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cohere embed API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Embedder, EmbeddingError};

pub const COHERE_API_URL: &str = "https://api.cohere.ai";

/// Embedder backed by `POST /v1/embed`
pub struct CohereEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
    client: Client,
}

impl CohereEmbedder {
    /// Create a new Cohere embedder
    ///
    /// # Arguments
    /// * `api_key` - Cohere API key
    /// * `model` - Embedding model name (e.g. `embed-english-light-v2.0`)
    /// * `dimensions` - Vector size the model produces
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: String,
        model: String,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: COHERE_API_URL.to_string(),
            model,
            dimensions,
            timeout,
            client,
        })
    }

    /// Point the client at a different host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbedRequest {
            model: &self.model,
            texts: [text],
            truncate: "END",
        };

        let response = self
            .client
            .post(format!("{}/v1/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    EmbeddingError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        let vector = data
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embeddings returned".to_string()))?;

        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        debug!("Embedded {} chars with {}", text.len(), self.model);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: [&'a str; 1],
    truncate: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
