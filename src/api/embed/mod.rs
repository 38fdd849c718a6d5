// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! POST /embed returns every chunk of the document with its embedding;
//! POST /embed-text returns a single embedding for the whole text.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{embed_handler, embed_text_handler};
pub use request::EmbedRequest;
pub use response::{ChunkEmbedding, EmbedResponse, EmbedTextResponse};
