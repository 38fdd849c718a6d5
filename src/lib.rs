// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod version;

// Re-export main types
pub use api::http_server::{create_app, start_server, AppState};
pub use chunking::{mean_pool, Chunk, ChunkingConfig, TextChunker};
pub use config::{ConfigError, ServiceConfig};
pub use embeddings::{
    ChunkResult, DocumentEmbedding, Embedding, EmbeddingPipeline, Encoder, HashEncoder,
    OnnxEmbeddingModel, PipelineError,
};
