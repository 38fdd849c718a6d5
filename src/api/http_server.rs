// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::embed::{embed_handler, embed_text_handler};
use crate::chunking::ChunkingConfig;
use crate::embeddings::{EmbeddingPipeline, Encoder};

/// Shared, read-only state for all requests
///
/// Holds the encoder loaded once at startup, wrapped in the chunking
/// pipeline.
#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<EmbeddingPipeline>,
}

impl AppState {
    pub fn new(encoder: Arc<dyn Encoder>, chunking: ChunkingConfig) -> Self {
        Self {
            pipeline: Arc::new(EmbeddingPipeline::new(encoder, chunking)),
        }
    }

    pub fn pipeline(&self) -> &EmbeddingPipeline {
        &self.pipeline
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/embed", post(embed_handler))
        .route("/embed-text", post(embed_text_handler))
        // Documents have no size cap
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
