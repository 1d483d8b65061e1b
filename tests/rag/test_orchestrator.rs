// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RagOrchestrator tests: entity resolution, grounding, prompt assembly, failures

use std::sync::Arc;
use std::time::Duration;

use stoq_rag::llm::{ChatTurn, LlmError, Role};
use stoq_rag::market::DocumentSource;
use stoq_rag::rag::{
    ChatError, OrchestratorConfig, RagError, RagOrchestrator, DEFAULT_SYSTEM_PROMPT,
};

use crate::common::{
    apple_documents, capped_knowledge_base, knowledge_base, orchestrator, HashingEmbedder,
    RecordingCompletion, ScriptedPlanner, StaticSource,
};

#[tokio::test]
async fn test_chat_grounds_answer_in_entity_documents() {
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(
        kb.clone(),
        ScriptedPlanner::new("aapl\n", &["Apple quarterly earnings revenue"]),
        completion.clone(),
    );

    let outcome = rag
        .chat("What happened to AAPL earnings?", &[])
        .await
        .unwrap();

    assert_eq!(outcome.entity.as_deref(), Some("AAPL"));
    assert!(!outcome.response.is_empty());
    assert!(outcome.citations.is_none());
    assert!(kb.is_embedded("AAPL"));

    let prompt = completion.last_prompt();
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[0].role, Role::System);
    assert!(prompt[0]
        .content
        .starts_with(&format!("{}\nContext: ", DEFAULT_SYSTEM_PROMPT)));
    assert!(prompt[0]
        .content
        .contains("Apple quarterly earnings revenue grew on iPhone sales"));
    assert_eq!(prompt[1], ChatTurn::user("What happened to AAPL earnings?"));
}

#[tokio::test]
async fn test_history_placed_between_system_and_message() {
    let kb = knowledge_base(HashingEmbedder::new(), Vec::new()).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(kb, ScriptedPlanner::new("MSFT", &[]), completion.clone());

    let history = vec![
        ChatTurn::user("Tell me about Microsoft"),
        ChatTurn::assistant("Microsoft makes software."),
    ];
    rag.chat("And its cloud revenue?", &history).await.unwrap();

    let prompt = completion.last_prompt();
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[0], ChatTurn::system(DEFAULT_SYSTEM_PROMPT));
    assert_eq!(&prompt[1..3], history.as_slice());
    assert_eq!(prompt[3], ChatTurn::user("And its cloud revenue?"));
}

#[tokio::test]
async fn test_no_queries_means_no_context() {
    let sources: Vec<Arc<dyn DocumentSource>> = vec![StaticSource::new("filings", apple_documents())];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(kb, ScriptedPlanner::new("AAPL", &[]), completion.clone());

    let outcome = rag.chat("Hi there", &[]).await.unwrap();
    assert_eq!(outcome.context_documents, 0);
    assert_eq!(completion.last_prompt()[0].content, DEFAULT_SYSTEM_PROMPT);
}

#[tokio::test]
async fn test_duplicate_documents_appear_once_in_context() {
    let sources: Vec<Arc<dyn DocumentSource>> = vec![StaticSource::new("filings", apple_documents())];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(
        kb,
        ScriptedPlanner::new("AAPL", &["apple earnings", "apple earnings revenue", "apple"]),
        completion.clone(),
    );

    let outcome = rag.chat("How is Apple doing?", &[]).await.unwrap();
    // Three queries over a three-document store
    assert_eq!(outcome.queries.len(), 3);
    assert_eq!(outcome.context_documents, 3);

    let system = &completion.last_prompt()[0].content;
    assert_eq!(
        system
            .matches("Apple quarterly earnings revenue grew on iPhone sales")
            .count(),
        1
    );
    assert_eq!(system.matches("investopedia").count(), 1);
}

#[tokio::test]
async fn test_unusable_entity_fails_open() {
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(
        kb.clone(),
        ScriptedPlanner::new("I'm not sure which company you mean", &["markets"]),
        completion.clone(),
    );

    let outcome = rag.chat("What is a P/E ratio?", &[]).await.unwrap();
    assert_eq!(outcome.entity, None);
    assert!(!outcome.response.is_empty());
    assert_eq!(filings.calls(), 0);
    assert!(kb.embedded_entities().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_does_not_fail_chat() {
    let embedder = HashingEmbedder::new();
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(embedder.clone(), sources).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(
        kb.clone(),
        ScriptedPlanner::new("AAPL", &["apple earnings"]),
        completion.clone(),
    );

    embedder.set_failing(true);
    let outcome = rag.chat("What happened to AAPL earnings?", &[]).await.unwrap();
    assert!(!outcome.response.is_empty());
    assert_eq!(outcome.context_documents, 0);
    assert!(!kb.is_embedded("AAPL"));

    embedder.set_failing(false);
    let outcome = rag.chat("What happened to AAPL earnings?", &[]).await.unwrap();
    assert!(kb.is_embedded("AAPL"));
    assert!(outcome.context_documents > 0);
    assert_eq!(filings.calls(), 2);
}

#[tokio::test]
async fn test_collector_failure_does_not_fail_chat() {
    let filings = StaticSource::new("filings", apple_documents());
    filings.set_failing(true);
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    let kb = knowledge_base(HashingEmbedder::new(), sources).await;
    let rag = orchestrator(
        kb.clone(),
        ScriptedPlanner::new("AAPL", &["apple"]),
        RecordingCompletion::new(),
    );

    let outcome = rag.chat("AAPL news?", &[]).await.unwrap();
    assert_eq!(outcome.entity.as_deref(), Some("AAPL"));
    assert!(!kb.is_embedded("AAPL"));
}

#[tokio::test]
async fn test_extraction_failure_aborts() {
    let kb = knowledge_base(HashingEmbedder::new(), Vec::new()).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(kb, ScriptedPlanner::failing(&[]), completion.clone());

    let err = rag.chat("AAPL?", &[]).await.unwrap_err();
    assert!(matches!(err, ChatError::Extraction(LlmError::Api { status: 503, .. })));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_aborts() {
    let kb = knowledge_base(HashingEmbedder::new(), Vec::new()).await;
    let completion = RecordingCompletion::new();
    completion.set_failing(true);
    let rag = orchestrator(kb, ScriptedPlanner::new("AAPL", &[]), completion);

    let err = rag.chat("AAPL?", &[]).await.unwrap_err();
    assert!(matches!(err, ChatError::Generation(_)));
    assert!(err.to_string().contains("model overloaded"));
}

#[tokio::test]
async fn test_slow_generation_times_out() {
    let kb = knowledge_base(HashingEmbedder::new(), Vec::new()).await;
    let rag = RagOrchestrator::new(
        kb,
        ScriptedPlanner::new("AAPL", &[]),
        RecordingCompletion::slow(Duration::from_millis(500)),
        OrchestratorConfig {
            call_timeout: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        },
    );

    let err = rag.chat("AAPL?", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Generation(LlmError::Timeout { timeout_ms: 50 })
    ));
}

#[tokio::test]
async fn test_store_ceiling_aborts_chat() {
    let filings = StaticSource::new("filings", apple_documents());
    let sources: Vec<Arc<dyn DocumentSource>> = vec![filings.clone()];
    // Bootstrap (1) fits, bootstrap plus the entity's documents (3) does not
    let kb = capped_knowledge_base(HashingEmbedder::new(), sources, 2).await;
    let completion = RecordingCompletion::new();
    let rag = orchestrator(
        kb.clone(),
        ScriptedPlanner::new("AAPL", &["apple earnings"]),
        completion.clone(),
    );

    let err = rag.chat("What happened to AAPL earnings?", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Retrieval(RagError::CapacityExceeded {
            requested: 3,
            limit: 2
        })
    ));
    assert!(!kb.is_embedded("AAPL"));
    assert_eq!(kb.store().len().await, 1);
    assert_eq!(completion.calls(), 0);
}
