// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding capability
//!
//! The retrieval pipeline only depends on the [`Embedder`] trait. The production
//! implementation talks to the Cohere embed API; tests plug in deterministic fakes.

pub mod cohere;

use async_trait::async_trait;
use thiserror::Error;

pub use cohere::CohereEmbedder;

/// Errors raised by an embedding backend
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport-level failure talking to the embedding service
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("Embedding API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The service answered but the payload was unusable
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// The produced vector does not match the index dimensions
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built for
        expected: usize,
        /// Dimension returned by the embedder
        actual: usize,
    },

    /// The call did not complete in time
    #[error("Embedding timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },
}

/// Text to fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality of every vector this embedder produces
    fn dimensions(&self) -> usize;

    /// Model identifier, used in logs
    fn model_name(&self) -> &str;
}
