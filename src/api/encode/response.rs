// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response bodies for the informational endpoints
//!
//! Encoding endpoints answer with the embedding itself as nested float lists.

use crate::encoders::EncoderParams;
use serde::Serialize;

/// One entry of GET /encoders
#[derive(Debug, Clone, Serialize)]
pub struct EncoderInfo {
    pub name: String,

    /// Absent for encoders registered at runtime without a built-in kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<EncoderParams>,
}

/// Body of GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: crate::version::VERSION_NUMBER.to_string(),
        }
    }
}
