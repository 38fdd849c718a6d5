// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_embed_service::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::{Encoder, HashEncoder, OnnxEmbeddingModel},
    version,
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());
    info!("Build: {}", version::VERSION);
    info!("Features: {}", version::FEATURES.join(", "));

    let config = ServiceConfig::parse();
    config.validate()?;
    let chunking = config.chunking()?;
    let addr = config.bind_addr()?;

    info!(
        "Chunking: chunk_size={}, overlap={}, stride={}",
        chunking.chunk_size(),
        chunking.overlap(),
        chunking.stride()
    );

    // The encoder is loaded exactly once and shared read-only afterwards
    let encoder: Arc<dyn Encoder> = if config.dev_encoder {
        warn!("Using deterministic hash encoder - embeddings carry no semantic meaning");
        Arc::new(HashEncoder::new(config.dimension)?)
    } else {
        info!("Loading model {}...", config.model_name);
        let model = OnnxEmbeddingModel::new(
            config.model_name.clone(),
            &config.model_path,
            &config.tokenizer_path,
            config.dimension,
        )
        .await?
        .with_window_size(chunking.chunk_size())?;
        info!(
            "Model loaded successfully ({} dimensions, max {} tokens per pass)",
            model.dimension(),
            model.max_length()
        );
        Arc::new(model)
    };

    let state = Arc::new(AppState::new(encoder, chunking));
    start_server(addr, state).await
}
