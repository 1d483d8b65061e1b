// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cohere chat API client used for planning calls
//!
//! Entity extraction runs a plain chat call with the web-search connector so the
//! model can resolve company names it does not know. Query generation uses the
//! `search_queries_only` mode, which returns queries instead of an answer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ChatTurn, LlmError, QueryPlanner, Role};
use crate::embeddings::cohere::COHERE_API_URL;

const ENTITY_PREAMBLE: &str = "Return only the ticker (2-4 characters) for the company mentioned";
const QUERY_PREAMBLE: &str = "Generate search queries for the stock analysis";

pub struct CohereChatClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl CohereChatClient {
    /// Create a new Cohere chat client
    ///
    /// # Arguments
    /// * `api_key` - Cohere API key
    /// * `model` - Chat model (e.g. `command-r-plus`)
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: COHERE_API_URL.to_string(),
            model,
            timeout,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn chat(&self, request: &CohereChatRequest<'_>) -> Result<CohereChatResponse, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout.as_millis() as u64))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl QueryPlanner for CohereChatClient {
    async fn extract_entity(&self, message: &str) -> Result<String, LlmError> {
        let request = CohereChatRequest {
            message,
            model: &self.model,
            preamble: ENTITY_PREAMBLE,
            chat_history: Vec::new(),
            search_queries_only: false,
            connectors: vec![Connector { id: "web-search" }],
        };
        let response = self.chat(&request).await?;
        debug!("Entity extraction returned {:?}", response.text);
        Ok(response.text.unwrap_or_default())
    }

    async fn generate_queries(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<Vec<String>, LlmError> {
        let request = CohereChatRequest {
            message,
            model: &self.model,
            preamble: QUERY_PREAMBLE,
            chat_history: history.iter().map(CohereMessage::from).collect(),
            search_queries_only: true,
            connectors: Vec::new(),
        };
        let response = self.chat(&request).await?;
        let queries: Vec<String> = response
            .search_queries
            .unwrap_or_default()
            .into_iter()
            .map(|q| q.text)
            .filter(|q| !q.trim().is_empty())
            .collect();
        debug!("Generated {} retrieval queries", queries.len());
        Ok(queries)
    }
}

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    message: &'a str,
    model: &'a str,
    preamble: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<CohereMessage<'a>>,
    search_queries_only: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    connectors: Vec<Connector>,
}

#[derive(Serialize)]
struct Connector {
    id: &'static str,
}

#[derive(Serialize)]
struct CohereMessage<'a> {
    role: &'static str,
    message: &'a str,
}

impl<'a> From<&'a ChatTurn> for CohereMessage<'a> {
    fn from(turn: &'a ChatTurn) -> Self {
        let role = match turn.role {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "CHATBOT",
        };
        Self {
            role,
            message: &turn.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CohereChatResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    search_queries: Option<Vec<SearchQuery>>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    text: String,
}
