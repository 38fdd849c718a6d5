// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Document chunking and embedding aggregation
//!
//! Text longer than a single encoder pass is split into overlapping token
//! windows, and per-window embeddings are combined into one document vector.

pub mod aggregator;
pub mod chunker;

pub use aggregator::mean_pool;
pub use chunker::{
    window_starts, Chunk, ChunkingConfig, TextChunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP,
};
