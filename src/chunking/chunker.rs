// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sliding-window text chunker
//!
//! Tokenizes a document with the encoder's tokenizer, walks the token
//! sequence in windows of `chunk_size` tokens advancing by
//! `stride = chunk_size - overlap`, and renders each window back to text.
//!
//! Chunk text is produced by detokenization, so it is a best-effort
//! reconstruction and not guaranteed to be a byte-exact substring of the
//! input.

use crate::config::ConfigError;
use crate::embeddings::{Encoder, PipelineError};
use std::sync::Arc;
use tracing::debug;

/// Default tokens per window
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Default tokens shared between consecutive windows
pub const DEFAULT_OVERLAP: usize = 20;

/// Window configuration
///
/// Invariant: `chunk_size > 0` and `overlap < chunk_size`, so the stride is
/// always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Tokens advanced between successive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Start offsets of every window over a sequence of `n_tokens` tokens
///
/// A document that fits in one window (`0 < n_tokens <= chunk_size`) has the
/// single start `0`. Longer documents start a window at
/// `0, stride, 2 * stride, ...` while the offset is below `n_tokens`.
pub fn window_starts(n_tokens: usize, config: &ChunkingConfig) -> impl Iterator<Item = usize> {
    let step = if n_tokens <= config.chunk_size {
        n_tokens.max(1)
    } else {
        config.stride()
    };
    (0..n_tokens).step_by(step)
}

/// One window of the document, rendered back to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,

    /// Zero-based position in windowing order
    pub chunk_index: usize,

    /// Tokens covered by this window (`chunk_size`, or fewer for the last one)
    pub token_count: usize,
}

/// Splits documents into overlapping token windows
#[derive(Debug, Clone)]
pub struct TextChunker {
    encoder: Arc<dyn Encoder>,
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(encoder: Arc<dyn Encoder>, config: ChunkingConfig) -> Self {
        Self { encoder, config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Tokenizes `text` without special tokens or truncation
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        self.encoder
            .tokenize(text)
            .map_err(PipelineError::tokenization)
    }

    /// Splits `text` into ordered chunks
    ///
    /// An empty token sequence yields no chunks.
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>, PipelineError> {
        let tokens = self.tokenize(text)?;
        self.chunk_tokens(&tokens)
    }

    /// Windows an already tokenized document
    pub fn chunk_tokens(&self, tokens: &[u32]) -> Result<Vec<Chunk>, PipelineError> {
        let stride = self.config.stride();
        let chunks = window_starts(tokens.len(), &self.config)
            .map(|start| {
                let end = (start + self.config.chunk_size).min(tokens.len());
                let text = self
                    .encoder
                    .detokenize(&tokens[start..end])
                    .map_err(PipelineError::tokenization)?;

                Ok(Chunk {
                    text,
                    chunk_index: start / stride,
                    token_count: end - start,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        debug!(
            "Chunked {} tokens into {} windows (chunk_size={}, overlap={})",
            tokens.len(),
            chunks.len(),
            self.config.chunk_size,
            self.config.overlap
        );

        Ok(chunks)
    }
}
