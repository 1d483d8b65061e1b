// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Yahoo Finance news collector
//!
//! Uses the public search endpoint, which returns headline metadata only.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{CollectorError, DocumentSource};
use crate::rag::Document;

const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";
const SOURCE: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stoq-rag)";

pub struct YahooNews {
    base_url: String,
    news_count: usize,
    timeout: Duration,
    client: Client,
}

impl YahooNews {
    pub fn new(news_count: usize, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, 0))?;

        Ok(Self {
            base_url: YAHOO_API_URL.to_string(),
            news_count,
            timeout,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl DocumentSource for YahooNews {
    async fn fetch_documents(&self, entity: &str) -> Result<Vec<Document>, CollectorError> {
        let news_count = self.news_count.to_string();
        let response = self
            .client
            .get(format!("{}/v1/finance/search", self.base_url))
            .query(&[
                ("q", entity),
                ("quotesCount", "0"),
                ("newsCount", news_count.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, self.timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Err(CollectorError::from_status(SOURCE, response).await);
        }

        let data: YahooSearchResponse = response
            .json()
            .await
            .map_err(|e| CollectorError::invalid(SOURCE, e))?;

        Ok(data
            .news
            .into_iter()
            .map(|item| {
                let text = match &item.publisher {
                    Some(publisher) => format!("{} ({})", item.title, publisher),
                    None => item.title.clone(),
                };
                Document::new(item.title, item.link, text)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

#[derive(Debug, Deserialize)]
struct YahooSearchResponse {
    #[serde(default)]
    news: Vec<YahooNewsItem>,
}

#[derive(Debug, Deserialize)]
struct YahooNewsItem {
    title: String,
    link: String,
    #[serde(default)]
    publisher: Option<String>,
}
