// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Encoder lifecycle tests
//!
//! Every request builds a fresh encoder and unloads it before responding,
//! whether the encode call succeeds or fails.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use clip_embed_server::{
    api::http_server::{create_app, AppState},
    config::EncoderConfig,
    encoders::{Embedding, EmbeddingSize, Encoder, EncoderBuilder, EncoderError, EncoderParams},
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::util::ServiceExt;

const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

/// Text-only encoder that records how often it was unloaded
struct CountingEncoder {
    unloads: Arc<AtomicUsize>,
}

impl Encoder for CountingEncoder {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn unload(&mut self) -> Result<(), EncoderError> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn encode_text(&mut self, _text: &str) -> Result<Embedding, EncoderError> {
        Ok(Embedding::from_vec(vec![0.5, 0.5]))
    }

    fn get_params(&self) -> EncoderParams {
        EncoderParams {
            model_name: "counting".to_string(),
            embedding_size: EmbeddingSize::Length(2),
            embedding_list: false,
        }
    }
}

fn setup_app(unloads: &Arc<AtomicUsize>) -> Router {
    let mut builder = EncoderBuilder::new(EncoderConfig::default());
    let counter = unloads.clone();
    builder.register("counting", move |_: &EncoderConfig| {
        Ok(Box::new(CountingEncoder {
            unloads: counter.clone(),
        }) as Box<dyn Encoder>)
    });
    create_app(AppState::new(builder))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_unload_after_success_and_failure() {
    let unloads = Arc::new(AtomicUsize::new(0));

    let (status, body) = post_json(
        setup_app(&unloads),
        "/text",
        json!({"encoder": "counting", "data": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([0.5, 0.5]));
    assert_eq!(unloads.load(Ordering::SeqCst), 1);

    let (status, body) = post_json(
        setup_app(&unloads),
        "/image",
        json!({"encoder": "counting", "data": TINY_PNG_BASE64}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error_type"], "not_implemented");
    assert_eq!(unloads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unload_after_failed_frames() {
    let unloads = Arc::new(AtomicUsize::new(0));

    let (status, _) = post_json(
        setup_app(&unloads),
        "/frames",
        json!({"encoder": "counting", "data": [TINY_PNG_BASE64, TINY_PNG_BASE64]}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_unload_when_request_is_rejected() {
    let unloads = Arc::new(AtomicUsize::new(0));

    let (status, _) = post_json(setup_app(&unloads), "/text", json!({"encoder": "counting"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unloads.load(Ordering::SeqCst), 0);
}
