// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SEC filings collector
//!
//! Lists recent filings through FMP, downloads each filing document from EDGAR
//! and turns it into heading-bounded text chunks. Every chunk becomes one
//! document titled after its filing.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::extractor::{chunk_by_title, extract_sections};
use super::fmp::{FilingRef, FmpClient};
use super::{CollectorError, DocumentSource};
use crate::rag::Document;

const SOURCE: &str = "sec-filings";

pub struct SecFilings {
    fmp: Arc<FmpClient>,
    max_filings: usize,
    chunk_chars: usize,
    timeout: Duration,
    client: Client,
}

impl SecFilings {
    /// # Arguments
    /// * `fmp` - Client used to list filings
    /// * `user_agent` - EDGAR requires a descriptive User-Agent with contact info
    /// * `max_filings` - Number of most recent filings ingested per ticker
    /// * `chunk_chars` - Upper bound on the size of each chunk
    /// * `timeout` - Per-request timeout
    pub fn new(
        fmp: Arc<FmpClient>,
        user_agent: &str,
        max_filings: usize,
        chunk_chars: usize,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, 0))?;

        Ok(Self {
            fmp,
            max_filings,
            chunk_chars,
            timeout,
            client,
        })
    }

    async fn fetch_filing(&self, filing: &FilingRef) -> Result<String, CollectorError> {
        let response = self
            .client
            .get(&filing.final_link)
            .send()
            .await
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, self.timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Err(CollectorError::from_status(SOURCE, response).await);
        }

        response
            .text()
            .await
            .map_err(|e| CollectorError::invalid(SOURCE, e))
    }
}

#[async_trait]
impl DocumentSource for SecFilings {
    async fn fetch_documents(&self, entity: &str) -> Result<Vec<Document>, CollectorError> {
        let filings = self.fmp.sec_filings(entity, self.max_filings).await?;
        let mut documents = Vec::new();

        for filing in &filings {
            let html = match self.fetch_filing(filing).await {
                Ok(html) => html,
                Err(CollectorError::Api { status: 404, .. }) => {
                    warn!("Filing {} no longer available, skipping", filing.final_link);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let chunks = filing_chunks(&html, self.chunk_chars);
            debug!(
                "{} {} split into {} chunks",
                filing.symbol,
                filing.form_type,
                chunks.len()
            );

            let title = match &filing.filing_date {
                Some(date) => format!("{} {} filed {}", filing.symbol, filing.form_type, date),
                None => format!("{} {}", filing.symbol, filing.form_type),
            };
            documents.extend(
                chunks
                    .into_iter()
                    .map(|chunk| Document::new(title.clone(), filing.final_link.clone(), chunk)),
            );
        }

        Ok(documents)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

/// Text chunks of one filing document
pub fn filing_chunks(html: &str, chunk_chars: usize) -> Vec<String> {
    chunk_by_title(&extract_sections(html), chunk_chars)
}
