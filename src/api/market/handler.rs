// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cached market lookup handlers

use axum::extract::{Query, State};
use axum::Json;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::request::EarningsReportParams;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::market::{EarningsReport, Holding, MarketDataProvider};

/// GET/POST /top_thirteen_f - Largest holdings of the configured 13F filer
pub async fn top_thirteen_f_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Holding>>, ApiError> {
    let holdings = state.market.top_thirteen_f().await.map_err(|e| {
        warn!("13F lookup failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(holdings))
}

/// GET/POST /earnings_report?ticker&year&quarter - Quarterly income statement
///
/// # Errors
/// - 400 Bad Request: Missing parameter or non-integer year/quarter
/// - 404 Not Found: No report for that quarter
/// - 502 Bad Gateway: Provider failed
pub async fn earnings_report_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<EarningsReport>, ApiError> {
    let params = EarningsReportParams::from_query(&query).map_err(ApiError::InvalidRequest)?;
    debug!(
        "Earnings report request: {} {} Q{}",
        params.ticker, params.year, params.quarter
    );

    let report = state
        .market
        .earnings_report(&params.ticker, params.year, params.quarter)
        .await
        .map_err(|e| {
            warn!("Earnings lookup for {} failed: {}", params.ticker, e);
            ApiError::from(e)
        })?;
    Ok(Json(report))
}
