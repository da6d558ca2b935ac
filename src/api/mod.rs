// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod encode;
pub mod errors;
pub mod http_server;

pub use encode::{
    encoders_handler, frames_handler, health_handler, image_handler, text_handler, EncodeRequest,
    EncoderInfo, FramesRequest, HealthResponse,
};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_app, serve, start_server, AppState};
