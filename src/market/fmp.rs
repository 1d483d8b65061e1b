// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Financial Modeling Prep client
//!
//! Serves the structured lookups (13F holdings, quarterly income statements) and
//! lists SEC filings for the filings collector.

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CollectorError, EarningsReport, Holding, MarketDataProvider};

const FMP_API_URL: &str = "https://financialmodelingprep.com";
const SOURCE: &str = "fmp";

/// 13F reports are due 45 days after quarter end
const THIRTEEN_F_FILING_LAG_DAYS: i64 = 45;

/// Filing metadata from `/api/v3/sec_filings`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingRef {
    pub symbol: String,
    #[serde(rename = "type")]
    pub form_type: String,
    pub final_link: String,
    #[serde(default, rename = "fillingDate")]
    pub filing_date: Option<String>,
}

pub struct FmpClient {
    api_key: String,
    base_url: String,
    thirteen_f_cik: String,
    thirteen_f_top_n: usize,
    timeout: Duration,
    client: Client,
}

impl FmpClient {
    /// # Arguments
    /// * `api_key` - FMP API key
    /// * `thirteen_f_cik` - CIK of the institutional filer whose holdings are reported
    /// * `thirteen_f_top_n` - Number of largest positions returned
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: String,
        thirteen_f_cik: String,
        thirteen_f_top_n: usize,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, 0))?;

        Ok(Self {
            api_key,
            base_url: FMP_API_URL.to_string(),
            thirteen_f_cik,
            thirteen_f_top_n,
            timeout,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Most recent filings for a ticker, newest first
    pub async fn sec_filings(&self, ticker: &str, limit: usize) -> Result<Vec<FilingRef>, CollectorError> {
        let path = format!("/api/v3/sec_filings/{}", ticker);
        let mut filings: Vec<FilingRef> = self.get_json(&path, &[("page", "0")]).await?;
        filings.retain(|f| matches!(f.form_type.as_str(), "10-K" | "10-Q" | "8-K"));
        filings.truncate(limit);
        Ok(filings)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CollectorError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CollectorError::from_reqwest(SOURCE, e, self.timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Err(CollectorError::from_status(SOURCE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| CollectorError::invalid(SOURCE, e))
    }
}

#[async_trait]
impl MarketDataProvider for FmpClient {
    async fn top_thirteen_f(&self) -> Result<Vec<Holding>, CollectorError> {
        let date = latest_filed_quarter_end(Utc::now().date_naive())
            .format("%Y-%m-%d")
            .to_string();
        debug!("Fetching 13F holdings for CIK {} as of {}", self.thirteen_f_cik, date);

        let mut holdings: Vec<Holding> = self
            .get_json(
                "/api/v4/institutional-ownership/portfolio-holdings",
                &[
                    ("cik", self.thirteen_f_cik.as_str()),
                    ("date", date.as_str()),
                    ("page", "0"),
                ],
            )
            .await?;

        holdings.sort_by(|a, b| {
            b.market_value
                .partial_cmp(&a.market_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        holdings.truncate(self.thirteen_f_top_n);
        Ok(holdings)
    }

    async fn earnings_report(
        &self,
        ticker: &str,
        year: i32,
        quarter: u8,
    ) -> Result<EarningsReport, CollectorError> {
        let path = format!("/api/v3/income-statement/{}", ticker);
        let statements: Vec<serde_json::Value> = self
            .get_json(&path, &[("period", "quarter"), ("limit", "40")])
            .await?;

        let year = year.to_string();
        let period = format!("Q{}", quarter);
        statements
            .into_iter()
            .find(|s| {
                s.get("calendarYear").and_then(|v| v.as_str()) == Some(year.as_str())
                    && s.get("period").and_then(|v| v.as_str()) == Some(period.as_str())
            })
            .ok_or_else(|| {
                CollectorError::NotFound(format!("{} earnings report for {} {}", ticker, period, year))
            })
    }
}

/// Latest quarter end whose 13F filing deadline has passed
pub fn latest_filed_quarter_end(today: NaiveDate) -> NaiveDate {
    let cutoff = today - ChronoDuration::days(THIRTEEN_F_FILING_LAG_DAYS);
    let mut year = cutoff.year();
    let quarter_ends = [(12, 31), (9, 30), (6, 30), (3, 31)];

    loop {
        for (month, day) in quarter_ends {
            if let Some(end) = NaiveDate::from_ymd_opt(year, month, day) {
                if end <= cutoff {
                    return end;
                }
            }
        }
        year -= 1;
    }
}
