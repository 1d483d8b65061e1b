// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat pipeline
//!
//! Per request:
//! 1. resolve the entity the message is about (fail-open: no entity, no grounding)
//! 2. make sure that entity's documents are embedded (recoverable failures are absorbed)
//! 3. generate retrieval queries from the message and history
//! 4. retrieve top-k per query concurrently and build a deduplicated context block
//! 5. call the completion service with the system prompt, context, history and message

use futures::future::join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::errors::RagError;
use super::knowledge_base::{EmbedOutcome, KnowledgeBase};
use crate::llm::{ChatTurn, CompletionParams, CompletionService, LlmError, QueryPlanner};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an AI assistant specializing in stock analysis and financial information.";

/// Answers the model gives when there is no company in the message
const NON_ENTITIES: [&str; 3] = ["NONE", "NULL", "NA"];

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    /// Documents retrieved per generated query
    pub top_k: usize,
    pub params: CompletionParams,
    /// Deadline for each planner or completion call
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            top_k: 5,
            params: CompletionParams::default(),
            call_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Entity extraction failed: {0}")]
    Extraction(LlmError),

    #[error("Query generation failed: {0}")]
    QueryGeneration(LlmError),

    #[error("Generation failed: {0}")]
    Generation(LlmError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RagError),
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub citations: Option<Vec<serde_json::Value>>,
    /// Normalized entity, if one was resolved
    pub entity: Option<String>,
    pub queries: Vec<String>,
    /// Distinct documents placed in the context block
    pub context_documents: usize,
}

pub struct RagOrchestrator {
    knowledge: Arc<KnowledgeBase>,
    planner: Arc<dyn QueryPlanner>,
    completion: Arc<dyn CompletionService>,
    config: OrchestratorConfig,
}

impl RagOrchestrator {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        planner: Arc<dyn QueryPlanner>,
        completion: Arc<dyn CompletionService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            knowledge,
            planner,
            completion,
            config,
        }
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<ChatOutcome, ChatError> {
        let raw_entity = self
            .call(self.planner.extract_entity(message))
            .await
            .map_err(ChatError::Extraction)?;
        let entity = normalize_entity(&raw_entity);

        match &entity {
            Some(ticker) => self.ensure_embedded(ticker).await?,
            None => info!("No entity in extraction result {:?}, answering without grounding", raw_entity),
        }

        let queries = self
            .call(self.planner.generate_queries(message, history))
            .await
            .map_err(ChatError::QueryGeneration)?;
        debug!("Generated {} retrieval queries", queries.len());

        let context = self.assemble_context(&queries).await?;

        let mut system = self.config.system_prompt.clone();
        if !context.is_empty() {
            system.push_str("\nContext: ");
            system.push_str(&context.join("\n"));
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatTurn::system(system));
        messages.extend(history.iter().cloned());
        messages.push(ChatTurn::user(message));

        let completion = self
            .call(self.completion.complete(&messages, self.config.params))
            .await
            .map_err(ChatError::Generation)?;

        Ok(ChatOutcome {
            response: completion.text,
            citations: completion.citations,
            entity,
            queries,
            context_documents: context.len(),
        })
    }

    /// Only store invariant violations fail the request
    async fn ensure_embedded(&self, ticker: &str) -> Result<(), ChatError> {
        match self.knowledge.ensure_entity_embedded(ticker).await {
            Ok(EmbedOutcome::Embedded { documents }) => {
                info!("Embedded {} on demand ({} documents)", ticker, documents)
            }
            Ok(EmbedOutcome::AlreadyEmbedded) => {}
            Err(e) if e.is_fatal() => {
                error!("[{}] Embedding {} failed: {}", e.error_code(), ticker, e);
                return Err(ChatError::Retrieval(e));
            }
            Err(e) => warn!(
                "[{}] Embedding {} failed, continuing with existing context: {}",
                e.error_code(),
                ticker,
                e
            ),
        }
        Ok(())
    }

    /// Distinct document texts for all queries, in retrieval order
    async fn assemble_context(&self, queries: &[String]) -> Result<Vec<String>, ChatError> {
        let store = self.knowledge.store();
        let results = join_all(
            queries
                .iter()
                .map(|query| store.retrieve(query, self.config.top_k)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut context = Vec::new();
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(documents) => {
                    for document in documents {
                        let text = document.content().to_string();
                        if seen.insert(text.clone()) {
                            context.push(text);
                        }
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!("[{}] Retrieval for {:?} failed: {}", e.error_code(), query, e);
                    return Err(ChatError::Retrieval(e));
                }
                Err(e) => warn!("Retrieval for {:?} failed, skipping: {}", query, e),
            }
        }
        Ok(context)
    }

    async fn call<T>(
        &self,
        call: impl Future<Output = Result<T, LlmError>>,
    ) -> Result<T, LlmError> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(LlmError::Timeout {
                    timeout_ms: self.config.call_timeout.as_millis() as u64,
                })
            })
    }
}

/// Reduce an extraction result to a ticker symbol
///
/// Accepts a single token of 1-5 characters starting with a letter, allowing
/// `.` and `-` inside (`BRK.B`). Surrounding punctuation such as `$` or quotes
/// is dropped. Anything else yields `None`.
pub fn normalize_entity(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() || trimmed.split_whitespace().count() != 1 {
        return None;
    }

    let ticker = trimmed.to_ascii_uppercase();
    if ticker.len() > 5 || NON_ENTITIES.contains(&ticker.as_str()) {
        return None;
    }
    if !ticker.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return None;
    }
    Some(ticker)
}
