// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP handlers for POST /embed and POST /embed-text
//!
//! Requests reach these handlers already validated by the `EmbedRequest`
//! extractor. Any pipeline failure becomes a 500 with the underlying
//! message; nothing is retried and no partial result is returned.

use crate::api::embed::{EmbedRequest, EmbedResponse, EmbedTextResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

/// POST /embed handler
///
/// # Request Body
/// ```json
/// { "text": "long document ..." }
/// ```
///
/// # Response Body
/// ```json
/// {
///   "chunks": [
///     { "text": "long document ...", "chunk_index": 0, "embedding": [0.1, ...] }
///   ]
/// }
/// ```
///
/// An empty document yields `{"chunks": []}`.
pub async fn embed_handler(
    State(state): State<Arc<AppState>>,
    request: EmbedRequest,
) -> Result<Json<EmbedResponse>, ApiError> {
    info!("Embed endpoint called ({} bytes)", request.text.len());

    let response = EmbedResponse::from(state.pipeline().embed_chunks(&request.text).await?);
    info!("Generated embeddings for {} chunks", response.chunk_count());

    Ok(Json(response))
}

/// POST /embed-text handler
///
/// # Request Body
/// ```json
/// { "text": "what is the refund policy?" }
/// ```
///
/// # Response Body
/// ```json
/// { "embedding": [0.1, 0.2, ...] }
/// ```
pub async fn embed_text_handler(
    State(state): State<Arc<AppState>>,
    request: EmbedRequest,
) -> Result<Json<EmbedTextResponse>, ApiError> {
    info!("Embed-text endpoint called ({} bytes)", request.text.len());

    let embedding = state.pipeline().embed_text(&request.text).await?;
    info!("Generated embedding of dimension {}", embedding.len());

    Ok(Json(EmbedTextResponse { embedding }))
}
