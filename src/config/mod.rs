// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every flag can also be supplied through the environment (and a `.env`
//! file, loaded by the binary before parsing).

use crate::chunking::{ChunkingConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use clap::Parser;
use std::net::SocketAddr;
use thiserror::Error;

/// Output width of all-MiniLM-L6-v2
pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("chunk_size must be greater than 0")]
    InvalidChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
    #[error("embedding dimension must be greater than 0")]
    InvalidDimension,
    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

/// Fabstir embedding service
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-embed-service")]
#[command(about = "Chunked text embedding service", long_about = None)]
pub struct ServiceConfig {
    /// Interface to bind the HTTP server to
    #[arg(long, env = "EMBED_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "EMBED_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Embedding model name reported in logs
    #[arg(long, env = "EMBED_MODEL_NAME", default_value = "all-MiniLM-L6-v2")]
    pub model_name: String,

    /// Path to ONNX model file
    #[arg(
        long,
        env = "EMBED_MODEL_PATH",
        default_value = "./models/all-MiniLM-L6-v2-onnx/model.onnx"
    )]
    pub model_path: String,

    /// Path to tokenizer JSON file
    #[arg(
        long,
        env = "EMBED_TOKENIZER_PATH",
        default_value = "./models/all-MiniLM-L6-v2-onnx/tokenizer.json"
    )]
    pub tokenizer_path: String,

    /// Tokens per chunk window
    #[arg(long, env = "EMBED_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Tokens shared between consecutive windows
    #[arg(long, env = "EMBED_CHUNK_OVERLAP", default_value_t = DEFAULT_OVERLAP)]
    pub overlap: usize,

    /// Expected embedding dimension
    #[arg(long, env = "EMBED_DIMENSION", default_value_t = DEFAULT_DIMENSION)]
    pub dimension: usize,

    /// Serve with the deterministic hash encoder instead of loading the ONNX model
    #[arg(long, env = "EMBED_DEV_ENCODER")]
    pub dev_encoder: bool,
}

impl ServiceConfig {
    /// Builds the validated chunk window configuration
    pub fn chunking(&self) -> Result<ChunkingConfig, ConfigError> {
        ChunkingConfig::new(self.chunk_size, self.overlap)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Validates everything that can be checked before the model is loaded
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::InvalidDimension);
        }
        self.chunking()?;
        self.bind_addr()?;
        Ok(())
    }
}
