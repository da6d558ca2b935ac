// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error handling tests for the encoding endpoints
//!
//! Verifies status codes and error bodies for:
//! - missing or empty request fields
//! - malformed JSON
//! - undecodable images
//! - unknown encoder names
//! - device memory exhaustion during model construction
//! - missing model weights

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use clip_embed_server::{
    api::http_server::{create_app, AppState},
    config::EncoderConfig,
    encoders::{EncoderBuilder, EncoderError, SUPPORTED_ENCODERS},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn setup_app() -> Router {
    create_app(AppState::new(EncoderBuilder::new(EncoderConfig::default())))
}

async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

#[tokio::test]
async fn test_missing_encoder_is_bad_request() {
    for uri in ["/text", "/image"] {
        let (status, body) = post_json(setup_app(), uri, json!({"data": "hello"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error_type"], "bad_request");
    }
}

#[tokio::test]
async fn test_missing_data_is_bad_request() {
    for uri in ["/text", "/image"] {
        let (status, body) = post_json(setup_app(), uri, json!({"encoder": "default"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["message"].as_str().unwrap().starts_with("Bad request"));
    }
}

#[tokio::test]
async fn test_empty_fields_are_bad_request() {
    let (status, _) = post_json(setup_app(), "/text", json!({"encoder": "", "data": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        setup_app(),
        "/text",
        json!({"encoder": "default", "data": ""}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) = post_raw(setup_app(), "/text", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "bad_request");
}

#[tokio::test]
async fn test_undecodable_image_is_invalid_image() {
    let (status, body) = post_json(
        setup_app(),
        "/image",
        json!({"encoder": "default", "data": "not-valid-base64!!!"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_image");

    // Valid base64, but not an image
    let (status, body) = post_json(
        setup_app(),
        "/image",
        json!({"encoder": "default", "data": "aGVsbG8gd29ybGQ="}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_image");
}

#[tokio::test]
async fn test_unknown_encoder_lists_supported_names() {
    let (status, body) = post_json(
        setup_app(),
        "/text",
        json!({"encoder": "nonexistent", "data": "hello"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_type"], "unsupported_encoder");
    assert!(body["message"].as_str().unwrap().contains("nonexistent"));
    assert_eq!(body["details"]["supported"], json!(SUPPORTED_ENCODERS));
}

#[tokio::test]
async fn test_out_of_memory_during_construction() {
    let mut builder = EncoderBuilder::new(EncoderConfig::default());
    builder.register("clip", |_: &EncoderConfig| Err(EncoderError::OutOfDeviceMemory));
    let app = create_app(AppState::new(builder));

    let (status, body) = post_json(app, "/text", json!({"encoder": "clip", "data": "hello"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "CUDA out of memory");
}

#[tokio::test]
async fn test_runtime_oom_message_is_classified() {
    let mut builder = EncoderBuilder::new(EncoderConfig::default());
    builder.register("clip", |_: &EncoderConfig| {
        Err(EncoderError::from_runtime(
            "CUDA failure 2: out of memory ; GPU=0 ; expr=cudaMalloc",
        ))
    });
    let app = create_app(AppState::new(builder));

    let (status, body) = post_json(app, "/text", json!({"encoder": "clip", "data": "x"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "CUDA out of memory");
}

#[tokio::test]
async fn test_missing_weights_is_service_unavailable() {
    let clip_dir = tempfile::tempdir().unwrap();
    let vclip_dir = tempfile::tempdir().unwrap();
    let config = EncoderConfig {
        clip_model_dir: clip_dir.path().to_path_buf(),
        vclip_weights_dir: vclip_dir.path().to_path_buf(),
        ..Default::default()
    };

    for encoder in ["clip", "clip-centroid", "vclip"] {
        let app = create_app(AppState::new(EncoderBuilder::new(config.clone())));
        let (status, body) =
            post_json(app, "/text", json!({"encoder": encoder, "data": "hello"})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", encoder);
        assert_eq!(body["error_type"], "model_unavailable");
    }
}
