// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::chat::chat_handler;
use super::market::{earnings_report_handler, top_thirteen_f_handler};
use crate::cache::CachedMarketData;
use crate::rag::RagOrchestrator;
use crate::version;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RagOrchestrator>,
    pub market: Arc<CachedMarketData>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // RAG chat
        .route("/chat", post(chat_handler))
        // Cached market lookups
        .route(
            "/top_thirteen_f",
            get(top_thirteen_f_handler).post(top_thirteen_f_handler),
        )
        .route(
            "/earnings_report",
            get(earnings_report_handler).post(earnings_report_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let knowledge = state.orchestrator.knowledge();
    let store = knowledge.store();
    let holdings = state.market.holdings_stats();
    let earnings = state.market.earnings_stats();

    Json(json!({
        "status": "healthy",
        "version": version::get_version_info(),
        "documents": store.len().await,
        "index_capacity": store.capacity().await,
        "embedded_entities": knowledge.embedded_entities(),
        "query_cache": {
            "top_thirteen_f": {"entries": holdings.entries, "hits": holdings.hits, "misses": holdings.misses},
            "earnings_report": {"entries": earnings.entries, "hits": earnings.hits, "misses": earnings.misses},
        },
    }))
}
