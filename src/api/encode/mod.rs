// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Encoding API module
//!
//! POST /text, /image and /frames route a payload to a named encoder;
//! GET /encoders and /health describe the server.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{encoders_handler, frames_handler, health_handler, image_handler, text_handler};
pub use request::{EncodeRequest, FramesRequest, MAX_FRAMES};
pub use response::{EncoderInfo, HealthResponse};
