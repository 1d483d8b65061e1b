// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat API request types

use serde::{Deserialize, Serialize};

use crate::llm::ChatTurn;

/// Request body for POST /chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatApiRequest {
    /// User message (required, non-blank)
    #[serde(default)]
    pub message: Option<String>,

    /// Prior turns of the conversation, oldest first
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl ChatApiRequest {
    /// The message, if present and non-blank
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}
