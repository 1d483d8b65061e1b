// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Market data endpoints
//!
//! `/top_thirteen_f` and `/earnings_report`, both served through the query cache.

pub mod handler;
pub mod request;

pub use handler::{earnings_report_handler, top_thirteen_f_handler};
pub use request::EarningsReportParams;
