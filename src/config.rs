// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded first by
//! the binary). Missing numeric values fall back to defaults; API keys have none.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_QUERY_CACHE_CAPACITY;
use crate::llm::CompletionParams;

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3-groq-70b-8192-tool-use-preview";
pub const DEFAULT_COHERE_CHAT_MODEL: &str = "command-r-plus";
pub const DEFAULT_COHERE_EMBED_MODEL: &str = "embed-english-light-v2.0";
/// Berkshire Hathaway
pub const DEFAULT_THIRTEEN_F_CIK: &str = "0001067983";

/// API keys for the external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub cohere: Option<String>,
    /// Key for the OpenAI-compatible completion endpoint
    pub completion: Option<String>,
    pub fmp: Option<String>,
    /// News collection from Benzinga is skipped without a key
    pub benzinga: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub keys: ApiKeys,
    pub completion_base_url: String,
    pub completion_model: String,
    pub cohere_chat_model: String,
    pub cohere_embed_model: String,
    pub embedding_dimensions: usize,
    /// Documents retrieved per generated query
    pub top_k: usize,
    pub initial_capacity: usize,
    pub max_documents: usize,
    pub completion: CompletionParams,
    pub external_call_timeout_secs: u64,
    pub query_cache_capacity: usize,
    /// Entity embedded at startup; empty disables prewarming
    pub bootstrap_entity: String,
    pub thirteen_f_cik: String,
    pub thirteen_f_top_n: usize,
    /// EDGAR rejects requests without a descriptive User-Agent
    pub sec_user_agent: String,
    pub max_filings: usize,
    pub filing_chunk_chars: usize,
    pub news_count: usize,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            keys: ApiKeys {
                cohere: non_empty_var("COHERE_API_KEY"),
                completion: non_empty_var("COMPLETION_API_KEY"),
                fmp: non_empty_var("FMP_API_KEY"),
                benzinga: non_empty_var("BENZINGA_API_KEY"),
            },
            completion_base_url: env::var("COMPLETION_BASE_URL")
                .unwrap_or(defaults.completion_base_url),
            completion_model: env::var("COMPLETION_MODEL").unwrap_or(defaults.completion_model),
            cohere_chat_model: env::var("COHERE_CHAT_MODEL").unwrap_or(defaults.cohere_chat_model),
            cohere_embed_model: env::var("COHERE_EMBED_MODEL")
                .unwrap_or(defaults.cohere_embed_model),
            embedding_dimensions: parsed_var("EMBEDDING_DIMENSIONS", defaults.embedding_dimensions),
            top_k: parsed_var("RAG_TOP_K", defaults.top_k),
            initial_capacity: parsed_var("RAG_INITIAL_CAPACITY", defaults.initial_capacity),
            max_documents: parsed_var("RAG_MAX_DOCUMENTS", defaults.max_documents),
            completion: CompletionParams {
                temperature: parsed_var("COMPLETION_TEMPERATURE", defaults.completion.temperature),
                max_tokens: parsed_var("COMPLETION_MAX_TOKENS", defaults.completion.max_tokens),
            },
            external_call_timeout_secs: parsed_var(
                "EXTERNAL_CALL_TIMEOUT_SECS",
                defaults.external_call_timeout_secs,
            ),
            query_cache_capacity: parsed_var("QUERY_CACHE_CAPACITY", defaults.query_cache_capacity),
            bootstrap_entity: env::var("BOOTSTRAP_ENTITY").unwrap_or(defaults.bootstrap_entity),
            thirteen_f_cik: env::var("THIRTEEN_F_CIK").unwrap_or(defaults.thirteen_f_cik),
            thirteen_f_top_n: parsed_var("THIRTEEN_F_TOP_N", defaults.thirteen_f_top_n),
            sec_user_agent: env::var("SEC_USER_AGENT").unwrap_or(defaults.sec_user_agent),
            max_filings: parsed_var("SEC_MAX_FILINGS", defaults.max_filings),
            filing_chunk_chars: parsed_var("FILING_CHUNK_CHARS", defaults.filing_chunk_chars),
            news_count: parsed_var("NEWS_COUNT", defaults.news_count),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.keys.cohere.is_none() {
            return Err("COHERE_API_KEY is required".to_string());
        }
        if self.keys.completion.is_none() {
            return Err("COMPLETION_API_KEY is required".to_string());
        }
        if self.keys.fmp.is_none() {
            return Err("FMP_API_KEY is required".to_string());
        }
        if self.embedding_dimensions == 0 {
            return Err("Embedding dimensions must be greater than 0".to_string());
        }
        if self.top_k == 0 {
            return Err("RAG_TOP_K must be greater than 0".to_string());
        }
        if self.max_documents == 0 {
            return Err("RAG_MAX_DOCUMENTS must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(format!(
                "COMPLETION_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.completion.temperature
            ));
        }
        if self.external_call_timeout_secs == 0 {
            return Err("EXTERNAL_CALL_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.query_cache_capacity == 0 {
            return Err("QUERY_CACHE_CAPACITY must be greater than 0".to_string());
        }
        if self.filing_chunk_chars < 100 {
            return Err("FILING_CHUNK_CHARS must be at least 100".to_string());
        }
        Ok(())
    }

    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keys: ApiKeys::default(),
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            cohere_chat_model: DEFAULT_COHERE_CHAT_MODEL.to_string(),
            cohere_embed_model: DEFAULT_COHERE_EMBED_MODEL.to_string(),
            embedding_dimensions: 1024,
            top_k: 5,
            initial_capacity: 256,
            max_documents: 100_000,
            completion: CompletionParams::default(),
            external_call_timeout_secs: 30,
            query_cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
            bootstrap_entity: "AAPL".to_string(),
            thirteen_f_cik: DEFAULT_THIRTEEN_F_CIK.to_string(),
            thirteen_f_top_n: 10,
            sec_user_agent: "stoq-rag admin@example.com".to_string(),
            max_filings: 3,
            filing_chunk_chars: 1500,
            news_count: 10,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
