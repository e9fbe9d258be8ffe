//! Error types for the RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query text was empty
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Target collection does not exist in the store
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Prompt template missing or malformed
    #[error("Invalid prompt template: {0}")]
    InvalidPrompt(String),

    /// Embedding model call failed or returned the wrong number of vectors
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Could not reach the collection store
    #[error("Collection store unavailable: {0}")]
    StoreUnavailable(String),

    /// Collection store rejected the operation
    #[error("Collection store error: {0}")]
    Store(String),

    /// Language model call failed
    #[error("Language model invocation failed: {message}")]
    ModelInvocation { message: String, retryable: bool },

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a store transport error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Create a model invocation error
    pub fn model(message: impl Into<String>, retryable: bool) -> Self {
        Self::ModelInvocation {
            message: message.into(),
            retryable,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Validation failures are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::StoreUnavailable(_) | Error::Timeout { .. } => true,
            Error::ModelInvocation { retryable, .. } => *retryable,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Convert into a model invocation failure, keeping the retry classification
    pub fn into_model_failure(self) -> Self {
        match self {
            Error::ModelInvocation { .. } => self,
            other => {
                let retryable = other.is_retryable();
                Error::ModelInvocation {
                    message: other.to_string(),
                    retryable,
                }
            }
        }
    }

    /// Whether the caller can fix the request (4xx family)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery(_)
                | Error::CollectionNotFound(_)
                | Error::InvalidPrompt(_)
                | Error::FileParse { .. }
                | Error::UnsupportedFileType(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            Error::CollectionNotFound(_) => (StatusCode::NOT_FOUND, "collection_not_found"),
            Error::InvalidPrompt(_) => (StatusCode::BAD_REQUEST, "invalid_prompt"),
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            Error::ModelInvocation { .. } => (StatusCode::BAD_GATEWAY, "model_invocation_error"),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "retryable": retryable,
            }
        }));

        (status, body).into_response()
    }
}
