// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language-model collaborators
//!
//! Two capabilities are consumed by the chat pipeline:
//! - [`QueryPlanner`]: entity extraction and retrieval-query generation
//! - [`CompletionService`]: the final grounded generation

pub mod cohere;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cohere::CohereChatClient;
pub use openai::OpenAiCompatClient;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Decoding parameters, configured once per process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Generated text plus whatever citation metadata the service attached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default)]
    pub citations: Option<Vec<serde_json::Value>>,
}

/// Errors from planner or completion backends
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure
    #[error("LLM request failed: {0}")]
    Request(String),

    /// Non-success status from the provider
    #[error("LLM API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// Payload could not be interpreted
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The call did not complete in time
    #[error("LLM timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },
}

impl LlmError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout { timeout_ms }
        } else {
            LlmError::Request(err.to_string())
        }
    }
}

/// Planning calls made before retrieval
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Return the raw ticker-like identifier the message is about
    async fn extract_entity(&self, message: &str) -> Result<String, LlmError>;

    /// Produce zero or more retrieval queries for the message
    async fn generate_queries(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<Vec<String>, LlmError>;
}

/// Final generation call
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatTurn],
        params: CompletionParams,
    ) -> Result<Completion, LlmError>;
}
