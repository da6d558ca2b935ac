// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::encode::{
    encoders_handler, frames_handler, health_handler, image_handler, text_handler, MAX_FRAMES,
};
use crate::config::ServerConfig;
use crate::encoders::EncoderBuilder;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Base64 length of the largest accepted image
const MAX_IMAGE_BASE64: usize = MAX_IMAGE_SIZE.div_ceil(3) * 4;

/// Largest accepted request body: a full /frames clip plus JSON framing
pub const MAX_REQUEST_BODY: usize = MAX_FRAMES * MAX_IMAGE_BASE64 + 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub builder: Arc<EncoderBuilder>,
}

impl AppState {
    pub fn new(builder: EncoderBuilder) -> Self {
        Self {
            builder: Arc::new(builder),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Registered encoders
        .route("/encoders", get(encoders_handler))
        // Encoding endpoints
        .route("/text", post(text_handler))
        .route("/image", post(image_handler))
        .route("/frames", post(frames_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(EncoderBuilder::new(config.encoders.clone()));
    serve(config.listen_addr.parse::<SocketAddr>()?, state).await
}

/// Serves `state` on `addr` until ctrl-c
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let encoders = state.builder.supported_encoders().join(", ");
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Embedding server listening on {}", addr);
    tracing::info!("Encoders: {}", encoders);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Embedding server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
