// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// KnowledgeBase tests: at-most-once embedding, retry after failure, timeouts

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stoq_rag::market::DocumentSource;
use stoq_rag::rag::{EmbedOutcome, KnowledgeBase, RagError, VectorStore};

use crate::common::{
    apple_documents, bootstrap_documents, knowledge_base, store_config, HashingEmbedder,
    StaticSource,
};

#[tokio::test]
async fn test_bootstrap_embeds_reference_documents() {
    let kb = knowledge_base(HashingEmbedder::new(), Vec::new()).await;
    assert_eq!(kb.store().len().await, 1);
    assert_eq!(kb.store().indexed().await, 1);
    assert!(kb.embedded_entities().is_empty());

    let hits = kb.store().retrieve("investopedia", 1).await.unwrap();
    assert_eq!(hits[0].title, "investopedia");
}

#[tokio::test]
async fn test_bootstrap_fails_when_embedding_fails() {
    let embedder = HashingEmbedder::new();
    embedder.set_failing(true);
    let store = Arc::new(VectorStore::new(embedder, store_config()));

    let result =
        KnowledgeBase::bootstrap(store, Vec::new(), bootstrap_documents(), Duration::from_secs(1))
            .await;
    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[tokio::test]
async fn test_entity_embedded_once_across_sequential_calls() {
    let filings = StaticSource::new("filings", apple_documents());
    let news = StaticSource::new("news", vec![]);
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone(), news.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    let first = kb.ensure_entity_embedded("AAPL").await.unwrap();
    assert_eq!(first, EmbedOutcome::Embedded { documents: 2 });
    for _ in 0..3 {
        let again = kb.ensure_entity_embedded("AAPL").await.unwrap();
        assert_eq!(again, EmbedOutcome::AlreadyEmbedded);
    }

    assert_eq!(filings.calls(), 1);
    assert_eq!(news.calls(), 1);
    assert_eq!(kb.store().len().await, 3);
    assert!(kb.is_embedded("AAPL"));
    assert_eq!(kb.embedded_entities(), vec!["AAPL".to_string()]);
}

#[tokio::test]
async fn test_concurrent_calls_embed_once() {
    let filings = StaticSource::slow("filings", apple_documents(), Duration::from_millis(50));
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    let outcomes = join_all((0..8).map(|_| {
        let kb = kb.clone();
        async move { kb.ensure_entity_embedded("AAPL").await }
    }))
    .await;

    let embedded = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(EmbedOutcome::Embedded { .. })))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(EmbedOutcome::AlreadyEmbedded)))
        .count();
    assert_eq!(embedded, 1);
    assert_eq!(skipped, 7);
    assert_eq!(filings.calls(), 1);
    assert_eq!(kb.store().len().await, 3);
    assert_eq!(kb.store().indexed().await, 3);
}

#[tokio::test]
async fn test_concurrent_calls_on_spawned_tasks() {
    let filings = StaticSource::slow("filings", apple_documents(), Duration::from_millis(20));
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let kb = kb.clone();
            tokio::spawn(async move { kb.ensure_entity_embedded("AAPL").await.unwrap() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(filings.calls(), 1);
    assert_eq!(kb.store().len().await, 3);
}

#[tokio::test]
async fn test_embedding_failure_leaves_entity_unmarked() {
    let embedder = HashingEmbedder::new();
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(embedder.clone(), sources).await;

    embedder.set_failing(true);
    let err = kb.ensure_entity_embedded("AAPL").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
    assert!(!kb.is_embedded("AAPL"));
    assert_eq!(kb.store().len().await, 1);

    embedder.set_failing(false);
    let retry = kb.ensure_entity_embedded("AAPL").await.unwrap();
    assert_eq!(retry, EmbedOutcome::Embedded { documents: 2 });
    assert!(kb.is_embedded("AAPL"));
    assert_eq!(filings.calls(), 2);
}

#[tokio::test]
async fn test_collector_failure_aborts_whole_pass() {
    let filings = StaticSource::new("filings", apple_documents());
    let news = StaticSource::new("news", apple_documents());
    news.set_failing(true);
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone(), news.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    let err = kb.ensure_entity_embedded("AAPL").await.unwrap_err();
    assert!(matches!(err, RagError::Collector(_)));
    assert_eq!(err.error_code(), "COLLECTOR_FAILED");
    assert!(!kb.is_embedded("AAPL"));
    assert_eq!(kb.store().len().await, 1);

    news.set_failing(false);
    assert_eq!(
        kb.ensure_entity_embedded("AAPL").await.unwrap(),
        EmbedOutcome::Embedded { documents: 4 }
    );
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let slow = StaticSource::slow("slow", apple_documents(), Duration::from_millis(500));
    let sources: Vec<Arc<dyn DocumentSource>> = vec![slow];
    let store = Arc::new(VectorStore::new(HashingEmbedder::new(), store_config()));
    let kb = KnowledgeBase::bootstrap(store, sources, bootstrap_documents(), Duration::from_millis(50))
        .await
        .unwrap();

    let err = kb.ensure_entity_embedded("AAPL").await.unwrap_err();
    assert!(matches!(err, RagError::Timeout { timeout_ms: 50, .. }));
    assert!(!err.is_fatal());
    assert!(!kb.is_embedded("AAPL"));
}

#[tokio::test]
async fn test_empty_sources_still_mark_entity() {
    let sources: Vec<Arc<dyn DocumentSource>> = vec![StaticSource::new("news", vec![])];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    assert_eq!(
        kb.ensure_entity_embedded("ZZZZ").await.unwrap(),
        EmbedOutcome::Embedded { documents: 0 }
    );
    assert!(kb.is_embedded("ZZZZ"));
}

#[tokio::test]
async fn test_distinct_entities_embedded_independently() {
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;

    kb.ensure_entity_embedded("AAPL").await.unwrap();
    kb.ensure_entity_embedded("MSFT").await.unwrap();

    assert_eq!(filings.calls(), 2);
    assert_eq!(
        kb.embedded_entities(),
        vec!["AAPL".to_string(), "MSFT".to_string()]
    );
}

#[tokio::test]
async fn test_embedded_entity_does_not_wait_for_other_ingest() {
    let filings = StaticSource::slow("filings", apple_documents(), Duration::from_millis(800));
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    kb.ensure_entity_embedded("AAPL").await.unwrap();

    let ingest = {
        let kb = kb.clone();
        tokio::spawn(async move { kb.ensure_entity_embedded("MSFT").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let start = Instant::now();
    let outcome = kb.ensure_entity_embedded("AAPL").await.unwrap();
    assert_eq!(outcome, EmbedOutcome::AlreadyEmbedded);
    assert!(
        start.elapsed() < Duration::from_millis(400),
        "waited {:?} behind MSFT ingest",
        start.elapsed()
    );

    assert!(matches!(
        ingest.await.unwrap(),
        Ok(EmbedOutcome::Embedded { documents: 2 })
    ));
    assert_eq!(filings.calls(), 2);
}
