// Version information for the Fabstir embedding service

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-chunked-embeddings-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "sliding-window-chunking",
    "chunk-embeddings",
    "document-mean-pooling",
    "onnx-runtime",
    "dev-hash-encoder",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Embed Service {} ({})", VERSION_NUMBER, BUILD_DATE)
}
