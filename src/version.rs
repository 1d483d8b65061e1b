// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Stoq RAG server

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "rag-chat",
    "hnsw-retrieval",
    "on-demand-entity-embedding",
    "sec-filings",
    "news",
    "thirteen-f-holdings",
    "earnings-reports",
    "lru-query-cache",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Stoq RAG {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
