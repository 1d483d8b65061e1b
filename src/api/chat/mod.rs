// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat API endpoint
//!
//! Provides the `/chat` HTTP endpoint backed by the RAG orchestrator.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::chat_handler;
pub use request::ChatApiRequest;
pub use response::ChatApiResponse;
