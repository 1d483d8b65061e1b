// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod llm;
pub mod market;
pub mod rag;
pub mod version;

// Re-export main types
pub use api::{create_app, AppState};
pub use cache::{CachedMarketData, QueryCache};
pub use config::AppConfig;
pub use rag::{Document, KnowledgeBase, RagOrchestrator, VectorStore};
