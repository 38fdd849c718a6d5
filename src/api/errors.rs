// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::embeddings::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

pub const BAD_CONTENT_TYPE: &str = "Content-Type must be application/json";
pub const MISSING_TEXT_FIELD: &str = "Missing 'text' field";
pub const INVALID_JSON_BODY: &str = "Request body must be valid JSON";
pub const NOT_A_JSON_OBJECT: &str = "Request body must be a JSON object";
pub const TEXT_NOT_A_STRING: &str = "'text' field must be a string";

/// Body of every error response: `{"error": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Malformed user input, rejected before any encoder work (400)
    ValidationError(String),
    /// Failure while tokenizing, encoding or aggregating (500)
    EncodingError(String),
}

impl ApiError {
    pub fn bad_content_type() -> Self {
        ApiError::ValidationError(BAD_CONTENT_TYPE.to_string())
    }

    pub fn missing_text_field() -> Self {
        ApiError::ValidationError(MISSING_TEXT_FIELD.to_string())
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError(msg) | ApiError::EncodingError(msg) => msg.as_str(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message().to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError(_) => 400,
            ApiError::EncodingError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::EncodingError(msg) => write!(f, "Encoding error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::EncodingError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::ValidationError(msg) => warn!("Rejected request: {}", msg),
            ApiError::EncodingError(msg) => error!("Error generating embeddings: {}", msg),
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
