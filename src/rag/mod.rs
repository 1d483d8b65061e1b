// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Shared vector store, per-entity embedding cache and the chat pipeline

pub mod ann_index;
pub mod document;
pub mod errors;
pub mod knowledge_base;
pub mod orchestrator;
pub mod vector_store;

pub use ann_index::{AnnIndex, Neighbor};
pub use document::Document;
pub use errors::RagError;
pub use knowledge_base::{EmbedOutcome, KnowledgeBase};
pub use orchestrator::{
    normalize_entity, ChatError, ChatOutcome, OrchestratorConfig, RagOrchestrator,
    DEFAULT_SYSTEM_PROMPT,
};
pub use vector_store::{ScoredDocument, VectorStore, VectorStoreConfig};
