// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared in-memory vector store
//!
//! Composes the ANN index with an append-only document store. Label `i` in the
//! index always refers to `documents[i]`; both sides are only ever mutated together
//! under the write lock, so readers never observe one without the other.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::ann_index::AnnIndex;
use super::document::Document;
use super::errors::RagError;
use crate::embeddings::Embedder;

/// Embedding requests in flight while ingesting a batch
const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Elements the index is sized for before its first rebuild
    pub initial_capacity: usize,
    /// Hard ceiling on stored documents
    pub max_documents: usize,
    /// Deadline for a single embedding call
    pub embed_timeout: Duration,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            max_documents: 100_000,
            embed_timeout: Duration::from_secs(30),
        }
    }
}

/// A retrieved document and its distance to the query
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f32,
}

struct StoreInner {
    index: AnnIndex,
    documents: Vec<Document>,
}

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    config: VectorStoreConfig,
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>, config: VectorStoreConfig) -> Self {
        let index = AnnIndex::new(embedder.dimensions(), config.initial_capacity);
        Self {
            embedder,
            config,
            inner: RwLock::new(StoreInner {
                index,
                documents: Vec::new(),
            }),
        }
    }

    /// Embed and append documents, returning how many were added
    ///
    /// All documents are embedded before the write lock is taken. If any embedding
    /// fails nothing is added.
    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RagError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content().to_string()).collect();
        let vectors: Vec<Vec<f32>> = stream::iter(texts)
            .map(|text| async move { self.embed(&text).await })
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;

        let mut inner = self.inner.write().await;
        for vector in &vectors {
            inner.index.validate(vector)?;
        }

        let requested = inner.documents.len() + documents.len();
        if requested > self.config.max_documents {
            error!(
                "Refusing to add {} documents: store would hold {} (limit {})",
                documents.len(),
                requested,
                self.config.max_documents
            );
            return Err(RagError::CapacityExceeded {
                requested,
                limit: self.config.max_documents,
            });
        }

        let added = documents.len();
        for (document, vector) in documents.into_iter().zip(vectors) {
            let expected = inner.documents.len();
            let label = inner.index.insert(&vector)?;
            if label != expected {
                error!(
                    "Index assigned label {} but document store holds {} entries",
                    label, expected
                );
                return Err(RagError::IndexCorruption(format!(
                    "label {} assigned with {} documents stored",
                    label, expected
                )));
            }
            inner.documents.push(document);
        }

        info!(
            "Added {} documents to vector store ({} total)",
            added,
            inner.documents.len()
        );
        Ok(added)
    }

    /// Up to `k` documents closest to `query`, closest first
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, RagError> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping the cosine distance of each hit
    pub async fn retrieve_scored(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let vector = self.embed(query).await?;
        let inner = self.inner.read().await;
        let hits = inner.index.search(&vector, k)?;
        debug!("Query matched {} of {} documents", hits.len(), inner.documents.len());

        hits.into_iter()
            .map(|hit| match inner.documents.get(hit.label) {
                Some(document) => Ok(ScoredDocument {
                    document: document.clone(),
                    distance: hit.distance,
                }),
                None => {
                    error!(
                        "Index returned label {} with only {} documents stored",
                        hit.label,
                        inner.documents.len()
                    );
                    Err(RagError::IndexCorruption(format!(
                        "label {} has no document",
                        hit.label
                    )))
                }
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }

    /// Number of vectors held by the ANN index
    pub async fn indexed(&self) -> usize {
        self.inner.read().await.index.len()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.read().await.index.capacity()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        match tokio::time::timeout(self.config.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RagError::Timeout {
                operation: format!("{} embedding", self.embedder.model_name()),
                timeout_ms: self.config.embed_timeout.as_millis() as u64,
            }),
        }
    }
}
