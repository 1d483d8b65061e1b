// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Entity-level embedding cache over the shared vector store
//!
//! Tracks which entities (ticker symbols) already have their documents in the
//! store. Embedding an entity pulls documents from every configured source and
//! happens at most once per process: the membership re-check, the fetch and the
//! insert all run under a single writer gate. Entities already embedded are
//! answered without waiting on the gate.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::document::Document;
use super::errors::RagError;
use super::vector_store::VectorStore;
use crate::market::DocumentSource;

/// Result of [`KnowledgeBase::ensure_entity_embedded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    AlreadyEmbedded,
    Embedded { documents: usize },
}

pub struct KnowledgeBase {
    store: Arc<VectorStore>,
    sources: Vec<Arc<dyn DocumentSource>>,
    embedded: RwLock<HashSet<String>>,
    write_gate: Mutex<()>,
    fetch_timeout: Duration,
}

impl KnowledgeBase {
    /// Seed the store with general reference documents and wrap it
    ///
    /// Fails if the bootstrap documents cannot be embedded.
    pub async fn bootstrap(
        store: Arc<VectorStore>,
        sources: Vec<Arc<dyn DocumentSource>>,
        bootstrap_documents: Vec<Document>,
        fetch_timeout: Duration,
    ) -> Result<Self, RagError> {
        let added = store.add_documents(bootstrap_documents).await?;
        info!(
            "Knowledge base ready: {} bootstrap documents, {} sources",
            added,
            sources.len()
        );

        Ok(Self {
            store,
            sources,
            embedded: RwLock::new(HashSet::new()),
            write_gate: Mutex::new(()),
            fetch_timeout,
        })
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn is_embedded(&self, entity: &str) -> bool {
        self.embedded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(entity)
    }

    /// Embedded entities, sorted
    pub fn embedded_entities(&self) -> Vec<String> {
        let set = self
            .embedded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entities: Vec<String> = set.iter().cloned().collect();
        entities.sort();
        entities
    }

    /// Make sure documents for `entity` are in the store
    ///
    /// On any source or embedding failure nothing is added and the entity stays
    /// unmarked, so a later call retries.
    pub async fn ensure_entity_embedded(&self, entity: &str) -> Result<EmbedOutcome, RagError> {
        // The set only grows, so a hit here needs no gate
        if self.is_embedded(entity) {
            return Ok(EmbedOutcome::AlreadyEmbedded);
        }

        let _gate = self.write_gate.lock().await;
        if self.is_embedded(entity) {
            debug!("{} already embedded", entity);
            return Ok(EmbedOutcome::AlreadyEmbedded);
        }

        let documents = self.collect(entity).await?;
        let added = self.store.add_documents(documents).await?;

        self.embedded
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(entity.to_string());

        info!("Embedded {} documents for {}", added, entity);
        Ok(EmbedOutcome::Embedded { documents: added })
    }

    /// Fetch from every source concurrently; the first failure aborts the pass
    async fn collect(&self, entity: &str) -> Result<Vec<Document>, RagError> {
        let fetches = self.sources.iter().map(|source| async move {
            match tokio::time::timeout(self.fetch_timeout, source.fetch_documents(entity)).await {
                Ok(Ok(documents)) => {
                    debug!("{} returned {} documents for {}", source.name(), documents.len(), entity);
                    Ok(documents)
                }
                Ok(Err(e)) => {
                    warn!("{} failed for {}: {}", source.name(), entity, e);
                    Err(RagError::Collector(e))
                }
                Err(_) => {
                    warn!("{} timed out for {}", source.name(), entity);
                    Err(RagError::Timeout {
                        operation: format!("{} fetch", source.name()),
                        timeout_ms: self.fetch_timeout.as_millis() as u64,
                    })
                }
            }
        });

        let mut documents = Vec::new();
        for result in join_all(fetches).await {
            documents.extend(result?);
        }
        Ok(documents)
    }
}
