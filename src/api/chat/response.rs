// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat API response types

use serde::{Deserialize, Serialize};

use crate::rag::ChatOutcome;

/// Response body for POST /chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatApiResponse {
    pub response: String,
    /// Citation metadata from the completion service; `null` when absent
    pub citations: Option<Vec<serde_json::Value>>,
}

impl From<ChatOutcome> for ChatApiResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            response: outcome.response,
            citations: outcome.citations,
        }
    }
}
