// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// A retrievable document
///
/// Immutable once added to the store. `text` may be absent for reference
/// documents; the title stands in for it when embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            text: Some(text.into()),
        }
    }

    /// Document with no body text
    pub fn reference(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            text: None,
        }
    }

    /// Text used for embedding and for prompt context
    pub fn content(&self) -> &str {
        match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.title,
        }
    }
}
