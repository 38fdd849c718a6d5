// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Chunked embedding pipeline
//!
//! raw text -> [`TextChunker`] -> one `encode_batch` call -> chunk/vector
//! pairing -> optional mean pooling into a document embedding.
//!
//! Any failure aborts the whole call; partial results are never returned.

use crate::chunking::{mean_pool, Chunk, ChunkingConfig, TextChunker};
use crate::embeddings::{Embedding, Encoder};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure inside tokenization, encoding or aggregation
///
/// Tokenizer and encoder messages are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Tokenization(String),

    #[error("{0}")]
    Encoding(String),

    #[error("Cannot aggregate empty embeddings")]
    EmptyAggregation,

    #[error("Unexpected embedding dimension: {actual} (expected {expected})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Encoder returned {actual} embeddings for {expected} inputs")]
    BatchSizeMismatch { expected: usize, actual: usize },
}

impl PipelineError {
    pub fn tokenization(err: anyhow::Error) -> Self {
        PipelineError::Tokenization(format!("{:#}", err))
    }

    pub fn encoding(err: anyhow::Error) -> Self {
        PipelineError::Encoding(format!("{:#}", err))
    }
}

/// A chunk paired with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    pub text: String,
    pub chunk_index: usize,
    pub embedding: Embedding,
}

/// Mean of all chunk embeddings of one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEmbedding {
    pub embedding: Embedding,
    pub chunk_count: usize,
}

/// Runs chunking, encoding and aggregation against a shared encoder
#[derive(Debug, Clone)]
pub struct EmbeddingPipeline {
    encoder: Arc<dyn Encoder>,
    chunker: TextChunker,
}

impl EmbeddingPipeline {
    pub fn new(encoder: Arc<dyn Encoder>, config: ChunkingConfig) -> Self {
        let chunker = TextChunker::new(encoder.clone(), config);
        Self { encoder, chunker }
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    /// Chunks `text` and embeds every chunk
    ///
    /// Returns results in `chunk_index` order; an empty document yields an
    /// empty list.
    pub async fn embed_chunks(&self, text: &str) -> Result<Vec<ChunkResult>, PipelineError> {
        let chunks = self.chunker.chunk(text)?;
        self.encode_chunks(chunks).await
    }

    /// Mean of the chunk embeddings of `text`
    ///
    /// Fails with [`PipelineError::EmptyAggregation`] when the document has
    /// no tokens.
    pub async fn embed_document(&self, text: &str) -> Result<DocumentEmbedding, PipelineError> {
        let results = self.embed_chunks(text).await?;
        Self::aggregate(results)
    }

    /// Single embedding for `text`
    ///
    /// Text that fits in one window (including the empty string) is encoded
    /// directly; longer text gets the document-level mean of its chunks.
    pub async fn embed_text(&self, text: &str) -> Result<Embedding, PipelineError> {
        let tokens = self.chunker.tokenize(text)?;

        if tokens.len() <= self.chunker.config().chunk_size() {
            let embedding = self
                .encoder
                .encode_single(text)
                .await
                .map_err(PipelineError::encoding)?;
            self.check_dimension(&embedding)?;
            return Ok(embedding);
        }

        let chunks = self.chunker.chunk_tokens(&tokens)?;
        let results = self.encode_chunks(chunks).await?;
        Ok(Self::aggregate(results)?.embedding)
    }

    async fn encode_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkResult>, PipelineError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .encoder
            .encode_batch(&texts)
            .await
            .map_err(PipelineError::encoding)?;

        if embeddings.len() != chunks.len() {
            return Err(PipelineError::BatchSizeMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            });
        }

        debug!("Encoded {} chunks", chunks.len());

        chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                self.check_dimension(&embedding)?;
                Ok(ChunkResult {
                    text: chunk.text,
                    chunk_index: chunk.chunk_index,
                    embedding,
                })
            })
            .collect()
    }

    fn aggregate(results: Vec<ChunkResult>) -> Result<DocumentEmbedding, PipelineError> {
        let embeddings: Vec<Embedding> = results.into_iter().map(|r| r.embedding).collect();
        let embedding = mean_pool(&embeddings)?;

        Ok(DocumentEmbedding {
            embedding,
            chunk_count: embeddings.len(),
        })
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), PipelineError> {
        let expected = self.encoder.dimension();
        if embedding.len() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}
