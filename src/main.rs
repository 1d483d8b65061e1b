// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{env, net::SocketAddr, sync::Arc};
use stoq_rag::{
    api::{start_server, AppState},
    cache::CachedMarketData,
    config::AppConfig,
    embeddings::CohereEmbedder,
    llm::{CohereChatClient, OpenAiCompatClient},
    market::{BenzingaNews, DocumentSource, FmpClient, SecFilings, YahooNews},
    rag::{
        normalize_entity, Document, KnowledgeBase, OrchestratorConfig, RagOrchestrator, VectorStore,
        VectorStoreConfig, DEFAULT_SYSTEM_PROMPT,
    },
    version,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stoq-server")]
#[command(about = "Stock analysis chat server", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8081)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("Starting {}", version::get_version_string());

    let config = AppConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    let state = build_state(&config).await?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    start_server(state, addr).await
}

/// Construct every service and embed the bootstrap data before serving
async fn build_state(config: &AppConfig) -> Result<AppState> {
    let timeout = config.external_call_timeout();
    let cohere_key = config.keys.cohere.clone().unwrap_or_default();
    let fmp_key = config.keys.fmp.clone().unwrap_or_default();

    let embedder = Arc::new(CohereEmbedder::new(
        cohere_key.clone(),
        config.cohere_embed_model.clone(),
        config.embedding_dimensions,
        timeout,
    )?);
    let planner = Arc::new(CohereChatClient::new(
        cohere_key,
        config.cohere_chat_model.clone(),
        timeout,
    )?);
    let completion = Arc::new(OpenAiCompatClient::new(
        config.keys.completion.clone().unwrap_or_default(),
        config.completion_base_url.clone(),
        config.completion_model.clone(),
        timeout,
    )?);

    let fmp = Arc::new(FmpClient::new(
        fmp_key,
        config.thirteen_f_cik.clone(),
        config.thirteen_f_top_n,
        timeout,
    )?);

    let mut sources: Vec<Arc<dyn DocumentSource>> = vec![Arc::new(SecFilings::new(
        fmp.clone(),
        &config.sec_user_agent,
        config.max_filings,
        config.filing_chunk_chars,
        timeout,
    )?)];
    match &config.keys.benzinga {
        Some(key) => sources.push(Arc::new(BenzingaNews::new(
            key.clone(),
            config.news_count,
            timeout,
        )?)),
        None => warn!("BENZINGA_API_KEY not set, Benzinga news disabled"),
    }
    sources.push(Arc::new(YahooNews::new(config.news_count, timeout)?));

    let store = Arc::new(VectorStore::new(
        embedder,
        VectorStoreConfig {
            initial_capacity: config.initial_capacity,
            max_documents: config.max_documents,
            embed_timeout: timeout,
        },
    ));
    let knowledge = Arc::new(
        KnowledgeBase::bootstrap(
            store,
            sources,
            vec![Document::reference(
                "investopedia",
                "https://www.investopedia.com/",
            )],
            timeout,
        )
        .await
        .context("failed to embed bootstrap documents")?,
    );

    if let Some(entity) = normalize_entity(&config.bootstrap_entity) {
        match knowledge.ensure_entity_embedded(&entity).await {
            Ok(outcome) => info!("Bootstrap entity {}: {:?}", entity, outcome),
            Err(e) => warn!("Could not embed bootstrap entity {}: {}", entity, e),
        }
    }

    let orchestrator = Arc::new(RagOrchestrator::new(
        knowledge,
        planner,
        completion,
        OrchestratorConfig {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            top_k: config.top_k,
            params: config.completion,
            call_timeout: timeout,
        },
    ));
    let market = Arc::new(CachedMarketData::new(fmp, config.query_cache_capacity));

    Ok(AppState {
        orchestrator,
        market,
    })
}
