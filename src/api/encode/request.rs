// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request bodies for POST /text, /image and /frames

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Most frames accepted by POST /frames, matching the 40-frame VCLIP checkpoint
pub const MAX_FRAMES: usize = 40;

/// Request body for POST /text and POST /image
///
/// `data` is the raw text for `/text` and a base64-encoded image for `/image`.
///
/// # Example
/// ```json
/// { "encoder": "clip", "data": "a photo of a dog" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeRequest {
    #[serde(default)]
    pub encoder: Option<String>,

    #[serde(default)]
    pub data: Option<String>,
}

/// Request body for POST /frames: an ordered list of base64-encoded frames
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FramesRequest {
    #[serde(default)]
    pub encoder: Option<String>,

    #[serde(default)]
    pub data: Option<Vec<String>>,
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("'{}' is required", field))),
    }
}

impl EncodeRequest {
    /// Returns `(encoder, data)` once both are present and non-empty
    pub fn validate(&self) -> Result<(&str, &str), ApiError> {
        let encoder = required("encoder", self.encoder.as_deref())?;
        let data = required("data", self.data.as_deref())?;
        Ok((encoder, data))
    }
}

impl FramesRequest {
    /// Returns `(encoder, frames)` once the encoder is named and at least one
    /// frame is given
    pub fn validate(&self) -> Result<(&str, &[String]), ApiError> {
        let encoder = required("encoder", self.encoder.as_deref())?;
        match self.data.as_deref() {
            Some(frames) if frames.len() > MAX_FRAMES => Err(ApiError::BadRequest(format!(
                "at most {} frames are accepted, got {}",
                MAX_FRAMES,
                frames.len()
            ))),
            Some(frames) if !frames.is_empty() => Ok((encoder, frames)),
            _ => Err(ApiError::BadRequest(
                "'data' must be a non-empty list of frames".to_string(),
            )),
        }
    }
}
