// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval subsystem
//!
//! Two classes of failure live here:
//! - recoverable: embedding, collector and timeout failures, absorbed by the chat
//!   pipeline where possible
//! - invariant violations: `CapacityExceeded` and `IndexCorruption`, which signal
//!   label/document desynchronization and must surface loudly

use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::market::CollectorError;

#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding a document or query failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The store refused to grow past its configured ceiling
    #[error("Index capacity exceeded: {requested} documents requested, limit is {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    /// Labels and documents are out of sync
    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    /// Vector does not match the index dimensions
    #[error("Dimension mismatch: expected {expected}D, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or Infinity
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// A document collector failed
    #[error("Collector failed: {0}")]
    Collector(#[from] CollectorError),

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl RagError {
    /// Invariant violations that must never be swallowed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RagError::CapacityExceeded { .. } | RagError::IndexCorruption(_)
        )
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            RagError::IndexCorruption(_) => "INDEX_CORRUPTION",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::InvalidVector(_) => "INVALID_VECTOR",
            RagError::Collector(_) => "COLLECTOR_FAILED",
            RagError::Timeout { .. } => "TIMEOUT",
        }
    }
}
