// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::embeddings::{Embedding, PipelineError};

/// Elementwise arithmetic mean of equally sized embeddings
///
/// Fails on an empty slice and on ragged input rather than returning a
/// zero vector. Sums are accumulated in `f64` so the result does not depend
/// on input order beyond final `f32` rounding.
pub fn mean_pool(embeddings: &[Embedding]) -> Result<Embedding, PipelineError> {
    let first = embeddings.first().ok_or(PipelineError::EmptyAggregation)?;
    let dimension = first.len();

    let mut sums = vec![0.0f64; dimension];
    for embedding in embeddings {
        if embedding.len() != dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: dimension,
                actual: embedding.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(embedding) {
            *sum += f64::from(*value);
        }
    }

    let count = embeddings.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}
