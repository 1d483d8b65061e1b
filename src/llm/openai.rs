// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat completions client (Groq, SambaNova, OpenAI)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ChatTurn, Completion, CompletionParams, CompletionService, LlmError};

pub struct OpenAiCompatClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OpenAiCompatClient {
    /// # Arguments
    /// * `api_key` - Bearer token for the provider
    /// * `base_url` - API root, e.g. `https://api.groq.com/openai/v1`
    /// * `model` - Model identifier
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatClient {
    async fn complete(
        &self,
        messages: &[ChatTurn],
        params: CompletionParams,
    ) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices returned".to_string()))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Completion used {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(Completion {
            text,
            citations: parsed.citations,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    citations: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
