// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health and GET /encoders tests, plus route registration

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use clip_embed_server::{
    api::http_server::{create_app, AppState},
    config::EncoderConfig,
    encoders::{DefaultEncoder, Encoder, EncoderBuilder, SUPPORTED_ENCODERS},
    version::VERSION_NUMBER,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn setup_app() -> Router {
    create_app(AppState::new(EncoderBuilder::new(EncoderConfig::default())))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(setup_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "version": VERSION_NUMBER}));
}

#[tokio::test]
async fn test_encoders_lists_builtins_with_params() {
    let (status, body) = get_json(setup_app(), "/encoders").await;
    assert_eq!(status, StatusCode::OK);

    let encoders = body.as_array().unwrap();
    let names: Vec<&str> = encoders
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, SUPPORTED_ENCODERS.to_vec());

    assert_eq!(
        encoders[0]["params"],
        json!({"model_name": "default", "embedding_size": 4, "embedding_list": false})
    );
    assert_eq!(
        encoders[1]["params"],
        json!({"model_name": "random", "embedding_size": [768], "embedding_list": false})
    );
    assert_eq!(encoders[2]["params"]["model_name"], "clip");
    assert_eq!(encoders[2]["params"]["embedding_size"], 768);
    assert_eq!(encoders[3]["params"]["model_name"], "clipcentroid");
    assert_eq!(encoders[4]["params"]["model_name"], "vclip");
    assert_eq!(encoders[4]["params"]["embedding_size"], 512);
}

#[tokio::test]
async fn test_encoders_includes_custom_registrations() {
    let mut builder = EncoderBuilder::new(EncoderConfig::default());
    builder.register("constant", |_: &EncoderConfig| {
        Ok(Box::new(DefaultEncoder::new(vec![0.0])) as Box<dyn Encoder>)
    });
    let app = create_app(AppState::new(builder));

    let (_, body) = get_json(app, "/encoders").await;
    let custom = body.as_array().unwrap().last().unwrap().clone();
    assert_eq!(custom, json!({"name": "constant"}));
}

#[tokio::test]
async fn test_encoding_routes_reject_get() {
    for uri in ["/text", "/image", "/frames"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = setup_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
    }
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/embed")
        .body(Body::empty())
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
