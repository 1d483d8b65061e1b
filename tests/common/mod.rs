// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic fakes for the external collaborators
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stoq_rag::api::AppState;
use stoq_rag::cache::CachedMarketData;
use stoq_rag::embeddings::{Embedder, EmbeddingError};
use stoq_rag::llm::{ChatTurn, Completion, CompletionParams, CompletionService, LlmError, QueryPlanner};
use stoq_rag::market::{CollectorError, DocumentSource, EarningsReport, Holding, MarketDataProvider};
use stoq_rag::rag::{
    Document, KnowledgeBase, OrchestratorConfig, RagOrchestrator, VectorStore, VectorStoreConfig,
};

pub const DIMENSIONS: usize = 128;

/// Bag-of-words embedder: each lowercase token is hashed into one bucket
pub struct HashingEmbedder {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Request("embedding service unavailable".to_string()));
        }

        let mut vector = vec![0.0f32; DIMENSIONS];
        // Shared bias keeps empty texts off the zero vector
        vector[0] = 0.05;
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = 1 + (fnv1a(token) % (DIMENSIONS as u64 - 1)) as usize;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

/// Document source returning a fixed set of documents
pub struct StaticSource {
    name: &'static str,
    documents: Vec<Document>,
    delay: Option<Duration>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &'static str, documents: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            name,
            documents,
            delay: None,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(name: &'static str, documents: Vec<Document>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            documents,
            delay: Some(delay),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch_documents(&self, entity: &str) -> Result<Vec<Document>, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollectorError::Api {
                source_name: self.name.to_string(),
                status: 503,
                message: format!("cannot fetch {}", entity),
            });
        }
        Ok(self.documents.clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Planner with canned answers
pub struct ScriptedPlanner {
    entity: Result<String, String>,
    queries: Vec<String>,
}

impl ScriptedPlanner {
    pub fn new(entity: &str, queries: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            entity: Ok(entity.to_string()),
            queries: queries.iter().map(|q| q.to_string()).collect(),
        })
    }

    /// Make entity extraction fail with an API error
    pub fn failing(queries: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            entity: Err("planner unavailable".to_string()),
            queries: queries.iter().map(|q| q.to_string()).collect(),
        })
    }
}

#[async_trait]
impl QueryPlanner for ScriptedPlanner {
    async fn extract_entity(&self, _message: &str) -> Result<String, LlmError> {
        match &self.entity {
            Ok(entity) => Ok(entity.clone()),
            Err(message) => Err(LlmError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }

    async fn generate_queries(
        &self,
        _message: &str,
        _history: &[ChatTurn],
    ) -> Result<Vec<String>, LlmError> {
        Ok(self.queries.clone())
    }
}

/// Completion service that records every prompt it receives
pub struct RecordingCompletion {
    prompts: Mutex<Vec<Vec<ChatTurn>>>,
    delay: Option<Duration>,
    fail: AtomicBool,
}

impl RecordingCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            delay: None,
            fail: AtomicBool::new(false),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_prompt(&self) -> Vec<ChatTurn> {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for RecordingCompletion {
    async fn complete(
        &self,
        messages: &[ChatTurn],
        _params: CompletionParams,
    ) -> Result<Completion, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 500,
                message: "model overloaded".to_string(),
            });
        }
        Ok(Completion {
            text: format!("Answer grounded in {} messages", messages.len()),
            citations: None,
        })
    }
}

/// Market data provider counting its lookups
#[derive(Default)]
pub struct CountingMarket {
    pub holdings_calls: AtomicUsize,
    pub earnings_calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for CountingMarket {
    async fn top_thirteen_f(&self) -> Result<Vec<Holding>, CollectorError> {
        self.holdings_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Holding {
            symbol: "AAPL".to_string(),
            security_name: "APPLE INC".to_string(),
            market_value: 1.5e11,
            shares_number: 9.0e8,
            weight: 42.0,
            change_in_shares_number: 0.0,
        }])
    }

    async fn earnings_report(
        &self,
        ticker: &str,
        year: i32,
        quarter: u8,
    ) -> Result<EarningsReport, CollectorError> {
        self.earnings_calls.fetch_add(1, Ordering::SeqCst);
        if year < 2000 {
            return Err(CollectorError::NotFound(format!(
                "{} earnings report for Q{} {}",
                ticker, quarter, year
            )));
        }
        Ok(serde_json::json!({
            "symbol": ticker,
            "calendarYear": year.to_string(),
            "period": format!("Q{}", quarter),
            "revenue": 1000 * year as i64 + quarter as i64,
        }))
    }
}

/// Documents about Apple returned by the default test sources
pub fn apple_documents() -> Vec<Document> {
    vec![
        Document::new(
            "AAPL 10-Q filed 2024-05-03",
            "https://www.sec.gov/aapl-10q",
            "Apple quarterly earnings revenue grew on iPhone sales",
        ),
        Document::new(
            "Apple supplier news",
            "https://news.example.com/apple",
            "Apple supplier margins pressured by component costs",
        ),
    ]
}

pub fn store_config() -> VectorStoreConfig {
    VectorStoreConfig {
        initial_capacity: 4,
        max_documents: 10_000,
        embed_timeout: Duration::from_secs(5),
    }
}

pub fn bootstrap_documents() -> Vec<Document> {
    vec![Document::reference("investopedia", "https://www.investopedia.com/")]
}

pub async fn knowledge_base(
    embedder: Arc<HashingEmbedder>,
    sources: Vec<Arc<dyn DocumentSource>>,
) -> Arc<KnowledgeBase> {
    let store = Arc::new(VectorStore::new(embedder, store_config()));
    Arc::new(
        KnowledgeBase::bootstrap(store, sources, bootstrap_documents(), Duration::from_secs(5))
            .await
            .expect("bootstrap should succeed"),
    )
}

/// Knowledge base whose store refuses to grow past `max_documents`
pub async fn capped_knowledge_base(
    embedder: Arc<HashingEmbedder>,
    sources: Vec<Arc<dyn DocumentSource>>,
    max_documents: usize,
) -> Arc<KnowledgeBase> {
    let config = VectorStoreConfig {
        max_documents,
        ..store_config()
    };
    let store = Arc::new(VectorStore::new(embedder, config));
    Arc::new(
        KnowledgeBase::bootstrap(store, sources, bootstrap_documents(), Duration::from_secs(5))
            .await
            .expect("bootstrap should succeed"),
    )
}

pub fn orchestrator(
    knowledge: Arc<KnowledgeBase>,
    planner: Arc<ScriptedPlanner>,
    completion: Arc<RecordingCompletion>,
) -> Arc<RagOrchestrator> {
    Arc::new(RagOrchestrator::new(
        knowledge,
        planner,
        completion,
        OrchestratorConfig::default(),
    ))
}

pub fn app_state(orchestrator: Arc<RagOrchestrator>, market: Arc<CountingMarket>) -> AppState {
    AppState {
        orchestrator,
        market: Arc::new(CachedMarketData::new(market, 32)),
    }
}
