// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for /health, /embed and /embed-text
//!
//! These tests drive the full router with the deterministic hash encoder,
//! which tokenizes one token per character so token counts are exact.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fabstir_embed_service::{
    api::{create_app, AppState, EmbedResponse, EmbedTextResponse},
    chunking::ChunkingConfig,
    embeddings::HashEncoder,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const DIMENSION: usize = 384;

fn setup_app() -> Router {
    let encoder = Arc::new(HashEncoder::new(DIMENSION).unwrap());
    create_app(Arc::new(AppState::new(encoder, ChunkingConfig::default())))
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = setup_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = read_json(response).await;
    assert_eq!(body, serde_json::json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_embed_short_text() {
    let response = setup_app()
        .oneshot(json_post("/embed", serde_json::json!({"text": "This is a test."})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = read_json(response).await;
    let chunks = body["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0]["chunk_index"], 0);
    assert_eq!(chunks[0]["text"], "This is a test.");
    assert_eq!(chunks[0]["embedding"].as_array().unwrap().len(), DIMENSION);
}

#[tokio::test]
async fn test_embed_exact_single_window() {
    let text = "a".repeat(256);
    let response = setup_app()
        .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedResponse = read_json(response).await;
    assert_eq!(body.chunks.len(), 1);
    assert_eq!(body.chunks[0].chunk_index, 0);
}

#[tokio::test]
async fn test_embed_two_windows() {
    // 300 tokens, stride 236: windows start at 0 and 236
    let text = "b".repeat(300);
    let response = setup_app()
        .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedResponse = read_json(response).await;
    assert_eq!(body.chunks.len(), 2);
    assert_eq!(body.chunks[0].chunk_index, 0);
    assert_eq!(body.chunks[1].chunk_index, 1);
    assert_eq!(body.chunks[0].text.chars().count(), 256);
    assert_eq!(body.chunks[1].text.chars().count(), 64);
    assert!(body.chunks.iter().all(|c| c.embedding.len() == DIMENSION));
}

#[tokio::test]
async fn test_embed_chunk_indices_have_no_gaps() {
    let text = "lorem ipsum dolor sit amet ".repeat(100); // 2700 tokens
    let response = setup_app()
        .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
        .await
        .unwrap();

    let body: EmbedResponse = read_json(response).await;
    let expected = (0..2700usize).step_by(236).count();
    assert_eq!(body.chunks.len(), expected);
    for (i, chunk) in body.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert_eq!(chunk.embedding.len(), DIMENSION);
    }
}

#[tokio::test]
async fn test_embed_empty_text_returns_no_chunks() {
    let response = setup_app()
        .oneshot(json_post("/embed", serde_json::json!({"text": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = read_json(response).await;
    assert_eq!(body, serde_json::json!({"chunks": []}));
}

#[tokio::test]
async fn test_embed_text_returns_single_embedding() {
    let response = setup_app()
        .oneshot(json_post(
            "/embed-text",
            serde_json::json!({"text": "what is the refund policy?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedTextResponse = read_json(response).await;
    assert_eq!(body.embedding.len(), DIMENSION);
}

#[tokio::test]
async fn test_embed_text_empty_string() {
    let response = setup_app()
        .oneshot(json_post("/embed-text", serde_json::json!({"text": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedTextResponse = read_json(response).await;
    assert_eq!(body.embedding.len(), DIMENSION);
}

#[tokio::test]
async fn test_embed_text_long_document_keeps_dimension() {
    let text = "c".repeat(5000);
    let response = setup_app()
        .oneshot(json_post("/embed-text", serde_json::json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedTextResponse = read_json(response).await;
    assert_eq!(body.embedding.len(), DIMENSION);
}

#[tokio::test]
async fn test_embed_text_accepts_body_over_two_mib() {
    let text = "d".repeat(3 * 1024 * 1024);
    let response = setup_app()
        .oneshot(json_post("/embed-text", serde_json::json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: EmbedTextResponse = read_json(response).await;
    assert_eq!(body.embedding.len(), DIMENSION);
}

#[tokio::test]
async fn test_embeddings_are_deterministic() {
    let text = "the same text twice ".repeat(20);

    let first: EmbedResponse = read_json(
        setup_app()
            .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
            .await
            .unwrap(),
    )
    .await;
    let second: EmbedResponse = read_json(
        setup_app()
            .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let app = setup_app();

    let requests = (0..8).map(|i| {
        let app = app.clone();
        async move {
            let text = format!("request number {} ", i).repeat(40);
            let response = app
                .oneshot(json_post("/embed", serde_json::json!({ "text": text })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            read_json::<EmbedResponse>(response).await
        }
    });

    let responses = futures_util::future::join_all(requests).await;
    assert_eq!(responses.len(), 8);
    for response in responses {
        assert!(!response.chunks.is_empty());
        assert!(response.chunks.iter().all(|c| c.embedding.len() == DIMENSION));
    }
}
