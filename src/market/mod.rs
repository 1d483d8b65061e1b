// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Market-data collectors
//!
//! Two kinds of collaborators live here:
//! - [`DocumentSource`]: raw text documents about a ticker (filings, news) that
//!   feed the vector store
//! - [`MarketDataProvider`]: structured, parameter-keyed lookups served by the
//!   read endpoints (13F holdings, earnings reports)

pub mod benzinga;
pub mod extractor;
pub mod filings;
pub mod fmp;
pub mod yahoo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rag::Document;

pub use benzinga::BenzingaNews;
pub use filings::SecFilings;
pub use fmp::FmpClient;
pub use yahoo::YahooNews;

/// Errors raised by collectors
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Transport-level failure
    #[error("{source_name} request failed: {message}")]
    Request {
        /// Collector that failed
        source_name: String,
        /// Underlying error message
        message: String,
    },

    /// Non-success status from the upstream API
    #[error("{source_name} API error: {status} - {message}")]
    Api {
        /// Collector that failed
        source_name: String,
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// Upstream payload could not be parsed
    #[error("{source_name} returned an invalid payload: {message}")]
    InvalidResponse {
        /// Collector that failed
        source_name: String,
        /// Parse error
        message: String,
    },

    /// Nothing matched the requested parameters
    #[error("No data found: {0}")]
    NotFound(String),

    /// Collector is not configured (missing API key)
    #[error("{0} is not configured")]
    NotConfigured(String),

    /// The call did not complete in time
    #[error("{source_name} timeout after {timeout_ms}ms")]
    Timeout {
        /// Collector that timed out
        source_name: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },
}

impl CollectorError {
    pub(crate) fn from_reqwest(source_name: &str, err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            CollectorError::Timeout {
                source_name: source_name.to_string(),
                timeout_ms,
            }
        } else {
            CollectorError::Request {
                source_name: source_name.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn invalid(source_name: &str, err: impl std::fmt::Display) -> Self {
        CollectorError::InvalidResponse {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }

    /// Map a non-success response into an `Api` error, consuming the body
    pub(crate) async fn from_status(source_name: &str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        CollectorError::Api {
            source_name: source_name.to_string(),
            status,
            message,
        }
    }
}

/// One source of raw documents about an entity
///
/// Calls are independent; an empty result is valid.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_documents(&self, entity: &str) -> Result<Vec<Document>, CollectorError>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// One institutional holding from a 13F filing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    #[serde(default)]
    pub security_name: String,
    #[serde(default)]
    pub market_value: f64,
    #[serde(default)]
    pub shares_number: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub change_in_shares_number: f64,
}

/// Financial report for one fiscal quarter, passed through as the provider returns it
pub type EarningsReport = serde_json::Value;

/// Read-only, parameter-keyed market lookups
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Largest positions of the configured 13F filer, latest filed quarter
    async fn top_thirteen_f(&self) -> Result<Vec<Holding>, CollectorError>;

    async fn earnings_report(
        &self,
        ticker: &str,
        year: i32,
        quarter: u8,
    ) -> Result<EarningsReport, CollectorError>;
}
