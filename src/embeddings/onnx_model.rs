// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! This module provides a wrapper around ONNX Runtime for running
//! the all-MiniLM-L6-v2 sentence transformer model.
//!
//! Features:
//! - ONNX model loading from disk
//! - GPU acceleration via CUDA (with automatic CPU fallback)
//! - BERT tokenization sized so a full chunk window plus [CLS]/[SEP] fits
//! - Untruncated tokenization and decoding for chunk windows
//! - Batch inference with attention-mask mean pooling
//! - Inference on the blocking thread pool

use crate::embeddings::{Embedding, Encoder};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

/// Content tokens per inference pass unless resized with `with_window_size`
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// [CLS] and [SEP] added around every encoded text
pub const SPECIAL_TOKENS: usize = 2;

/// Position embedding table size of BERT-style encoders
pub const MAX_POSITION_EMBEDDINGS: usize = 512;

/// ONNX-based embedding model (all-MiniLM-L6-v2)
///
/// # Model Details
/// - Input: Text strings (256 content tokens plus [CLS]/[SEP] by default)
/// - Output: 384-dimensional f32 vectors
/// - Provider: CUDA when available, otherwise CPU
///
/// # Thread Safety
/// All fields are wrapped in Arc for cheap cloning. The session is behind a
/// Mutex, so concurrent requests are serialised at inference time.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    /// ONNX Runtime session
    session: Arc<Mutex<Session>>,

    /// Tokenizer used for inference (truncates to max_length, special tokens included)
    tokenizer: Arc<Tokenizer>,

    /// Tokenizer used for chunk windows (no truncation, no padding)
    window_tokenizer: Arc<Tokenizer>,

    model_name: String,

    /// Output dimension (384 for all-MiniLM-L6-v2)
    dimension: usize,

    max_length: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer and runs one validation inference
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found or invalid
    /// - Tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - Model output width differs from `dimension`
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::new(
    ///     "all-MiniLM-L6-v2",
    ///     "./models/all-MiniLM-L6-v2-onnx/model.onnx",
    ///     "./models/all-MiniLM-L6-v2-onnx/tokenizer.json",
    ///     384,
    /// ).await?;
    /// ```
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        dimension: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!("Initializing ONNX embedding model {}", model_name);
        let session = Self::build_session(model_path)?;
        info!("ONNX session ready for {}", model_path.display());

        let mut window_tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        window_tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to disable truncation: {}", e))?;
        window_tokenizer.with_padding(None);

        let max_length = MAX_SEQUENCE_LENGTH + SPECIAL_TOKENS;
        let tokenizer = Self::inference_tokenizer(&window_tokenizer, max_length)?;

        let model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            window_tokenizer: Arc::new(window_tokenizer),
            model_name,
            dimension,
            max_length,
        };

        // Validation inference also checks the output width
        model
            .run_batch(&["validation test".to_string()])
            .context("Model validation inference failed")?;

        Ok(model)
    }

    /// Sizes inference so a window of `window_tokens` content tokens is
    /// encoded whole, with room for [CLS] and [SEP]
    ///
    /// Fails when the window would not fit the model's position embeddings.
    pub fn with_window_size(mut self, window_tokens: usize) -> Result<Self> {
        let max_length = window_tokens + SPECIAL_TOKENS;
        if max_length > MAX_POSITION_EMBEDDINGS {
            anyhow::bail!(
                "Chunk size {} exceeds the model limit of {} content tokens",
                window_tokens,
                MAX_POSITION_EMBEDDINGS - SPECIAL_TOKENS
            );
        }

        self.tokenizer = Arc::new(Self::inference_tokenizer(
            &self.window_tokenizer,
            max_length,
        )?);
        self.max_length = max_length;
        Ok(self)
    }

    fn inference_tokenizer(window_tokenizer: &Tokenizer, max_length: usize) -> Result<Tokenizer> {
        let mut tokenizer = window_tokenizer.clone();
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        Ok(tokenizer)
    }

    /// Tries the CUDA execution provider first, falling back to CPU
    fn build_session(model_path: &Path) -> Result<Session> {
        info!("   Attempting CUDA execution provider...");
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => {
                info!("CUDA execution provider initialized");
                Ok(session)
            }
            Err(e) => {
                warn!("CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
                Session::builder()
                    .context("Failed to create session builder")?
                    .with_execution_providers([CPUExecutionProvider::default().build()])
                    .context("Failed to set CPU execution provider")?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")?
                    .with_intra_threads(4)
                    .context("Failed to set intra threads")?
                    .commit_from_file(model_path)
                    .with_context(|| {
                        format!("Failed to load ONNX model from {}", model_path.display())
                    })
            }
        }
    }

    /// Tokenizes, pads to the longest sequence, runs inference and pools
    ///
    /// Blocking; async callers go through [`Encoder::encode_batch`].
    pub fn run_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = texts
            .iter()
            .map(|text| self.encode_for_inference(text))
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let batch_size = texts.len();
        let mut input_ids_batch = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_batch = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids_batch = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let padding_needed = max_len - ids.len();

            input_ids_batch.extend(ids.iter().map(|&id| id as i64));
            attention_mask_batch.extend(mask.iter().map(|&m| m as i64));
            token_type_ids_batch.extend(std::iter::repeat(0i64).take(ids.len()));

            input_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            attention_mask_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            token_type_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        // Keep a copy of the mask for pooling
        let attention_mask_for_pooling = attention_mask_batch.clone();

        let input_ids_array = Array2::from_shape_vec((batch_size, max_len), input_ids_batch)
            .context("Failed to create batch input_ids array")?;
        let attention_mask_array =
            Array2::from_shape_vec((batch_size, max_len), attention_mask_batch)
                .context("Failed to create batch attention_mask array")?;
        let token_type_ids_array =
            Array2::from_shape_vec((batch_size, max_len), token_type_ids_batch)
                .context("Failed to create batch token_type_ids array")?;

        let mut session_guard = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session_guard.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Index [0] rather than a name, export output names vary
        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Token-level output: [batch, seq_len, hidden_dim]
        let output_shape = output_array.shape();
        if output_shape.len() != 3 || output_shape[2] != self.dimension {
            anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, {}])",
                output_shape,
                self.dimension
            );
        }

        let mut embeddings: Vec<Embedding> = Vec::with_capacity(batch_size);

        for batch_idx in 0..batch_size {
            let batch_item = output_array.index_axis(Axis(0), batch_idx);
            let seq_len = batch_item.shape()[0];
            let hidden_dim = batch_item.shape()[1];

            let mask_start = batch_idx * max_len;
            let item_mask = &attention_mask_for_pooling[mask_start..mask_start + max_len];

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;

            for i in 0..seq_len {
                let mask_value = item_mask[i] as f32;
                sum_mask += mask_value;
                for j in 0..hidden_dim {
                    pooled[j] += batch_item[[i, j]] * mask_value;
                }
            }

            for val in &mut pooled {
                *val /= sum_mask.max(1e-9);
            }

            embeddings.push(pooled);
        }

        debug!("Encoded batch of {} texts (padded to {})", batch_size, max_len);

        Ok(embeddings)
    }

    /// Tokenizes exactly as inference does, special tokens included
    pub fn encode_for_inference(&self, text: &str) -> Result<Encoding> {
        self.tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))
    }

    /// Counts tokens in a text string, without special tokens or truncation
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.tokenize(text)?.len())
    }

    /// Longest encoded sequence, special tokens included
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

#[async_trait]
impl Encoder for OnnxEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .window_tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn detokenize(&self, tokens: &[u32]) -> Result<String> {
        self.window_tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("Detokenization failed: {}", e))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let model = self.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || model.run_batch(&texts))
            .await
            .context("Embedding task failed")?
    }
}
