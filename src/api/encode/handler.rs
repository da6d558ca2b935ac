// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Encoding handlers
//!
//! Every request builds its own encoder, encodes on a blocking worker thread
//! and unloads the encoder before responding.

use crate::api::encode::{EncodeRequest, EncoderInfo, FramesRequest, HealthResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::encoders::{Embedding, Encoder, EncoderBuilder, EncoderError, EncoderKind};
use crate::vision::{decode_base64_image, decode_frames};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// POST /text
///
/// # Request Body
/// ```json
/// { "encoder": "clip", "data": "a photo of a dog" }
/// ```
///
/// # Response Body
/// The embedding as nested float lists, e.g. `[[0.12, -0.03, ...]]` for `clip`.
pub async fn text_handler(
    State(state): State<AppState>,
    payload: Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<Json<Embedding>, ApiError> {
    let Json(request) = payload?;
    let (encoder, text) = request.validate()?;
    info!("Text encoding request for encoder '{}'", encoder);

    let text = text.to_string();
    let embedding = run_encoder(state.builder.clone(), encoder, move |enc| {
        enc.encode_text(&text)
    })
    .await?;
    Ok(Json(embedding))
}

/// POST /image
///
/// `data` carries the base64-encoded image bytes.
pub async fn image_handler(
    State(state): State<AppState>,
    payload: Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<Json<Embedding>, ApiError> {
    let Json(request) = payload?;
    let (encoder, data) = request.validate()?;
    info!("Image encoding request for encoder '{}'", encoder);

    let (image, image_info) = decode_base64_image(data).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::from(e)
    })?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let embedding = run_encoder(state.builder.clone(), encoder, move |enc| {
        enc.encode_image(&image)
    })
    .await?;
    Ok(Json(embedding))
}

/// POST /frames
///
/// `data` is an ordered list of base64-encoded frames of one clip.
pub async fn frames_handler(
    State(state): State<AppState>,
    payload: Result<Json<FramesRequest>, JsonRejection>,
) -> Result<Json<Embedding>, ApiError> {
    let Json(request) = payload?;
    let (encoder, data) = request.validate()?;
    info!(
        "Video encoding request for encoder '{}' ({} frames)",
        encoder,
        data.len()
    );

    let frames = decode_frames(data).map_err(|e| {
        warn!("Failed to decode frames: {}", e);
        ApiError::from(e)
    })?;

    let embedding = run_encoder(state.builder.clone(), encoder, move |enc| {
        enc.encode_video(&frames)
    })
    .await?;
    Ok(Json(embedding))
}

/// GET /encoders
pub async fn encoders_handler(State(state): State<AppState>) -> Json<Vec<EncoderInfo>> {
    let config = state.builder.config();
    let encoders = state
        .builder
        .supported_encoders()
        .into_iter()
        .map(|name| EncoderInfo {
            name: name.to_string(),
            params: name
                .parse::<EncoderKind>()
                .ok()
                .and_then(|kind| kind.params(config).ok()),
        })
        .collect();
    Json(encoders)
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Builds `name`, runs `op` on it off the async runtime and unloads it
async fn run_encoder<F>(
    builder: Arc<EncoderBuilder>,
    name: &str,
    op: F,
) -> Result<Embedding, ApiError>
where
    F: FnOnce(&mut dyn Encoder) -> Result<Embedding, EncoderError> + Send + 'static,
{
    let name = name.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let mut encoder = builder.build(&name)?;
        let result = op(encoder.as_mut());
        if let Err(e) = encoder.unload() {
            warn!("Failed to unload encoder '{}': {}", name, e);
        }
        result
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Encoding task failed: {}", e)))?;

    result.map_err(|e| {
        if !matches!(e, EncoderError::UnsupportedEncoder { .. }) {
            warn!("Encoding failed: {}", e);
        }
        ApiError::from(e)
    })
}
