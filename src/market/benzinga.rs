// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Benzinga news collector

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::extractor::html_to_text;
use super::{CollectorError, DocumentSource};
use crate::rag::Document;

const BENZINGA_API_URL: &str = "https://api.benzinga.com";
const SOURCE: &str = "benzinga";

pub struct BenzingaNews {
    api_key: String,
    base_url: String,
    page_size: usize,
    timeout: Duration,
    client: Client,
}

impl BenzingaNews {
    pub fn new(api_key: String, page_size: usize, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, 0))?;

        Ok(Self {
            api_key,
            base_url: BENZINGA_API_URL.to_string(),
            page_size,
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
impl DocumentSource for BenzingaNews {
    async fn fetch_documents(&self, entity: &str) -> Result<Vec<Document>, CollectorError> {
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(format!("{}/api/v2/news", self.base_url))
            .header("Accept", "application/json")
            .query(&[
                ("token", self.api_key.as_str()),
                ("tickers", entity),
                ("pageSize", page_size.as_str()),
                ("displayOutput", "full"),
            ])
            .send()
            .await
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, self.timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Err(CollectorError::from_status(SOURCE, response).await);
        }

        let articles: Vec<BenzingaArticle> = response
            .json()
            .await
            .map_err(|e| CollectorError::invalid(SOURCE, e))?;

        Ok(articles.into_iter().map(Document::from).collect())
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

#[derive(Debug, Deserialize)]
struct BenzingaArticle {
    title: String,
    url: String,
    #[serde(default)]
    teaser: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

impl From<BenzingaArticle> for Document {
    fn from(article: BenzingaArticle) -> Self {
        let body = article
            .body
            .filter(|b| !b.trim().is_empty())
            .or(article.teaser)
            .map(|html| html_to_text(&html))
            .unwrap_or_default();

        let text = if body.is_empty() {
            article.title.clone()
        } else {
            format!("{}\n{}", article.title, body)
        };

        Document::new(article.title, article.url, text)
    }
}
