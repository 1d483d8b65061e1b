// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cached front for the read-only market lookups

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{CacheStats, QueryCache};
use crate::market::{CollectorError, EarningsReport, Holding, MarketDataProvider};

/// Full parameter tuple of an earnings lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EarningsKey {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
}

impl EarningsKey {
    /// Key with the ticker trimmed and uppercased
    pub fn new(ticker: &str, year: i32, quarter: u8) -> Self {
        Self {
            ticker: ticker.trim().to_ascii_uppercase(),
            year,
            quarter,
        }
    }
}

pub struct CachedMarketData {
    provider: Arc<dyn MarketDataProvider>,
    holdings: QueryCache<(), Vec<Holding>>,
    earnings: QueryCache<EarningsKey, EarningsReport>,
}

impl CachedMarketData {
    pub fn new(provider: Arc<dyn MarketDataProvider>, capacity: usize) -> Self {
        Self {
            provider,
            holdings: QueryCache::new(capacity),
            earnings: QueryCache::new(capacity),
        }
    }

    pub fn holdings_stats(&self) -> CacheStats {
        self.holdings.stats()
    }

    pub fn earnings_stats(&self) -> CacheStats {
        self.earnings.stats()
    }
}

#[async_trait]
impl MarketDataProvider for CachedMarketData {
    async fn top_thirteen_f(&self) -> Result<Vec<Holding>, CollectorError> {
        self.holdings
            .get_or_try_insert_with((), || async {
                debug!("13F holdings cache miss");
                self.provider.top_thirteen_f().await
            })
            .await
    }

    async fn earnings_report(
        &self,
        ticker: &str,
        year: i32,
        quarter: u8,
    ) -> Result<EarningsReport, CollectorError> {
        let key = EarningsKey::new(ticker, year, quarter);
        let ticker = key.ticker.clone();
        self.earnings
            .get_or_try_insert_with(key, || async move {
                debug!("Earnings cache miss for {} {} Q{}", ticker, year, quarter);
                self.provider.earnings_report(&ticker, year, quarter).await
            })
            .await
    }
}
