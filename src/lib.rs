// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod encoders;
pub mod version;
pub mod vision;

pub use api::{create_app, start_server, ApiError, AppState};
pub use config::{EncoderConfig, ServerConfig};
pub use encoders::{
    Embedding, EmbeddingSize, Encoder, EncoderBuilder, EncoderError, EncoderKind, EncoderParams,
};
