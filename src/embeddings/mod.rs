// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text encoders and the chunked embedding pipeline
//!
//! The [`Encoder`] trait is the seam between the pipeline and the model.
//! It bundles the tokenizer capability (text to token ids and back) with
//! batch and single-text encoding into fixed-dimension vectors.
//!
//! Implementations:
//! - [`OnnxEmbeddingModel`]: all-MiniLM-L6-v2 on ONNX Runtime (production)
//! - [`HashEncoder`]: deterministic, model-free vectors (tests, benches, dev runs)

pub mod hash_encoder;
pub mod onnx_model;
pub mod pipeline;

pub use hash_encoder::HashEncoder;
pub use onnx_model::OnnxEmbeddingModel;
pub use pipeline::{ChunkResult, DocumentEmbedding, EmbeddingPipeline, PipelineError};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Fixed-length embedding vector
pub type Embedding = Vec<f32>;

/// Maps text to fixed-dimension vectors
///
/// The encoder is loaded once at startup and shared read-only across
/// requests, so implementations must be safe to call concurrently.
/// Encoding must be deterministic for fixed weights and must produce a
/// `dimension()`-length vector for every input, including the empty string.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Model identifier (e.g. "all-MiniLM-L6-v2")
    fn model_name(&self) -> &str;

    /// Length of every embedding this encoder returns
    fn dimension(&self) -> usize;

    /// Converts text into token ids, without special tokens or truncation
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;

    /// Renders a token window back into text
    fn detokenize(&self, tokens: &[u32]) -> Result<String>;

    /// Encodes `texts`, returning one embedding per input in the same order
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Encodes a single text
    ///
    /// Fails unless the batch call returns exactly one embedding.
    async fn encode_single(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.encode_batch(&[text.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(anyhow!(
                "Encoder returned {} embeddings for a single text",
                embeddings.len()
            ));
        }
        embeddings
            .pop()
            .ok_or_else(|| anyhow!("Encoder returned no embedding"))
    }
}


impl std::fmt::Debug for dyn Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("model_name", &self.model_name())
            .field("dimension", &self.dimension())
            .finish()
    }
}
