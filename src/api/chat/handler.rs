// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat endpoint handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::ChatApiRequest;
use super::response::ChatApiResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /chat - Answer a question with retrieval-augmented generation
///
/// # Request
/// - `message`: User message (required)
/// - `chat_history`: Prior turns as `{role, content}` (optional)
///
/// # Response
/// - `response`: Generated answer
/// - `citations`: Citation metadata or `null`
///
/// # Errors
/// - 400 Bad Request: Missing message or malformed JSON
/// - 500 Internal Server Error: Extraction, query generation or generation failed
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatApiRequest>, JsonRejection>,
) -> Result<Json<ChatApiResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected chat body: {}", rejection.body_text());
        ApiError::InvalidRequest(rejection.body_text())
    })?;

    let message = request
        .message()
        .ok_or_else(|| ApiError::InvalidRequest("Message is required".to_string()))?;
    debug!(
        "Chat request: {} chars, {} history turns",
        message.len(),
        request.chat_history.len()
    );

    let start = Instant::now();
    let outcome = state
        .orchestrator
        .chat(message, &request.chat_history)
        .await?;

    info!(
        "Chat complete in {}ms (entity: {}, queries: {}, context documents: {})",
        start.elapsed().as_millis(),
        outcome.entity.as_deref().unwrap_or("none"),
        outcome.queries.len(),
        outcome.context_documents
    );

    Ok(Json(outcome.into()))
}
