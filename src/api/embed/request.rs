// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed and POST /embed-text
//!
//! The request is validated once, in its extractor, before any handler or
//! encoder code runs. Handlers only ever see a well-formed `EmbedRequest`.

use crate::api::errors::{ApiError, INVALID_JSON_BODY, NOT_A_JSON_OBJECT, TEXT_NOT_A_STRING};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use serde::{Deserialize, Serialize};

/// Request body for the embedding endpoints
///
/// # Example
/// ```json
/// { "text": "Some document to embed" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Document text; may be empty
    pub text: String,
}

impl EmbedRequest {
    /// Parses and validates a JSON body
    ///
    /// # Validation Rules
    /// 1. Body must parse as JSON
    /// 2. Body must be a JSON object
    /// 3. Object must contain `text`
    /// 4. `text` must be a string
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ApiError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::ValidationError(INVALID_JSON_BODY.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| ApiError::ValidationError(NOT_A_JSON_OBJECT.to_string()))?;

        let text = object.get("text").ok_or_else(ApiError::missing_text_field)?;

        let text = text
            .as_str()
            .ok_or_else(|| ApiError::ValidationError(TEXT_NOT_A_STRING.to_string()))?;

        Ok(Self {
            text: text.to_string(),
        })
    }
}

/// True for `application/json` and `application/*+json`, parameters ignored
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[async_trait]
impl<S> FromRequest<S> for EmbedRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(req.headers()) {
            return Err(ApiError::bad_content_type());
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::ValidationError(e.body_text()))?;

        Self::from_json_slice(&body)
    }
}
