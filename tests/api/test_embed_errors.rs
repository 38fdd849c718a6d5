// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error Handling Tests for the Embedding API
//!
//! - Validation failures return 400 with a stable message
//! - Validation happens before the encoder is touched
//! - Encoder failures return 500 with the encoder's message
//! - Wrong methods are rejected by the router

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use fabstir_embed_service::{
    api::{create_app, AppState, ErrorResponse},
    chunking::ChunkingConfig,
    embeddings::{Embedding, Encoder, HashEncoder},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

/// Encoder whose encode calls always fail, counting every call it receives
#[derive(Default)]
struct FailingEncoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Encoder for FailingEncoder {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        384
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.chars().map(u32::from).collect())
    }

    fn detokenize(&self, tokens: &[u32]) -> Result<String> {
        Ok(tokens.iter().filter_map(|&t| char::from_u32(t)).collect())
    }

    async fn encode_batch(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("ONNX Runtime error: out of memory"))
    }
}

/// Encoder that returns vectors of the wrong width
struct NarrowEncoder;

#[async_trait]
impl Encoder for NarrowEncoder {
    fn model_name(&self) -> &str {
        "narrow"
    }

    fn dimension(&self) -> usize {
        384
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn detokenize(&self, tokens: &[u32]) -> Result<String> {
        Ok(tokens.iter().filter_map(|&t| char::from_u32(t)).collect())
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(vec![vec![0.0; 3]; texts.len()])
    }
}

fn app_with(encoder: Arc<dyn Encoder>) -> Router {
    create_app(Arc::new(AppState::new(encoder, ChunkingConfig::default())))
}

fn hash_app() -> Router {
    app_with(Arc::new(HashEncoder::new(384).unwrap()))
}

fn post(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn error_body(response: axum::response::Response) -> ErrorResponse {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_missing_text_field() {
    for uri in ["/embed-text", "/embed"] {
        let response = hash_app()
            .oneshot(post(uri, Some("application/json"), r#"{"wrong_field": "x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await.error, "Missing 'text' field");
    }
}

#[tokio::test]
async fn test_wrong_content_type() {
    for uri in ["/embed-text", "/embed"] {
        let response = hash_app()
            .oneshot(post(uri, Some("text/plain"), "just some text"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_body(response).await.error,
            "Content-Type must be application/json"
        );
    }
}

#[tokio::test]
async fn test_missing_content_type() {
    let response = hash_app()
        .oneshot(post("/embed-text", None, r#"{"text": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.error,
        "Content-Type must be application/json"
    );
}

#[tokio::test]
async fn test_malformed_json_body() {
    let response = hash_app()
        .oneshot(post("/embed", Some("application/json"), "{\"text\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.error,
        "Request body must be valid JSON"
    );
}

#[tokio::test]
async fn test_text_must_be_string() {
    let response = hash_app()
        .oneshot(post("/embed", Some("application/json"), r#"{"text": ["a"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.error,
        "'text' field must be a string"
    );
}

#[tokio::test]
async fn test_validation_runs_before_encoder() {
    let encoder = Arc::new(FailingEncoder::default());
    let app = app_with(encoder.clone());

    let response = app
        .oneshot(post("/embed", Some("application/json"), r#"{"nope": 1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_encoder_failure_returns_500() {
    for uri in ["/embed-text", "/embed"] {
        let app = app_with(Arc::new(FailingEncoder::default()));
        let response = app
            .oneshot(post(uri, Some("application/json"), r#"{"text": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_body(response).await.error,
            "ONNX Runtime error: out of memory"
        );
    }
}

#[tokio::test]
async fn test_wrong_dimension_returns_500() {
    let response = app_with(Arc::new(NarrowEncoder))
        .oneshot(post("/embed", Some("application/json"), r#"{"text": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = error_body(response).await.error;
    assert!(message.contains("384"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_embed_rejects_get() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/embed")
        .body(Body::empty())
        .unwrap();

    let response = hash_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = hash_app()
        .oneshot(post("/v1/embed", Some("application/json"), r#"{"text": "x"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
