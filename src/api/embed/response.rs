// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response bodies for the embedding endpoints

use crate::embeddings::{ChunkResult, Embedding};
use serde::{Deserialize, Serialize};

/// One chunk of the document with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEmbedding {
    /// Chunk text (detokenized window)
    pub text: String,

    /// Zero-based window position
    pub chunk_index: usize,

    /// D-dimensional embedding vector
    pub embedding: Embedding,
}

impl From<ChunkResult> for ChunkEmbedding {
    fn from(result: ChunkResult) -> Self {
        Self {
            text: result.text,
            chunk_index: result.chunk_index,
            embedding: result.embedding,
        }
    }
}

/// Response body for POST /embed
///
/// # Example
/// ```json
/// {
///   "chunks": [
///     { "text": "first window", "chunk_index": 0, "embedding": [0.1, ...] },
///     { "text": "second window", "chunk_index": 1, "embedding": [0.2, ...] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub chunks: Vec<ChunkEmbedding>,
}

impl EmbedResponse {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl From<Vec<ChunkResult>> for EmbedResponse {
    fn from(results: Vec<ChunkResult>) -> Self {
        Self {
            chunks: results.into_iter().map(ChunkEmbedding::from).collect(),
        }
    }
}

/// Response body for POST /embed-text
///
/// # Example
/// ```json
/// { "embedding": [0.1, 0.2, ...] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedTextResponse {
    pub embedding: Embedding,
}
