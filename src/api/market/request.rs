// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Market lookup request parameters

use std::collections::HashMap;

/// Validated parameters of `/earnings_report`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsReportParams {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
}

impl EarningsReportParams {
    /// Parse `ticker`, `year` and `quarter` from query parameters
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, String> {
        let ticker = params
            .get("ticker")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "ticker is required".to_string())?
            .to_ascii_uppercase();

        let year: i32 = required_int(params, "year")?;
        let quarter: i64 = required_int(params, "quarter")?;
        if !(1..=4).contains(&quarter) {
            return Err(format!("quarter must be between 1 and 4, got {}", quarter));
        }

        Ok(Self {
            ticker,
            year,
            quarter: quarter as u8,
        })
    }
}

fn required_int<T: std::str::FromStr>(params: &HashMap<String, String>, name: &str) -> Result<T, String> {
    let raw = params
        .get(name)
        .ok_or_else(|| format!("{} is required", name))?;
    raw.trim()
        .parse()
        .map_err(|_| format!("{} must be an integer, got '{}'", name, raw))
}
