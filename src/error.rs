//! Error types for the multimodal retrieval core.

use std::time::Duration;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised while loading or running the local embedding model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("failed to load model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("input {index} is empty after trimming")]
    EmptyInput { index: usize },

    #[error("embedding model error: {0}")]
    Model(#[from] ModelError),

    #[error("embedder returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding task failed: {0}")]
    TaskFailed(String),
}

/// Errors returned by external model endpoints (image summarization, answering).
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream model unavailable: {0}")]
    Unavailable(String),

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("upstream model timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("API key not configured (set GOOGLE_API_KEY or gemini.api_key)")]
    MissingApiKey,
}

impl Retryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) => true,
            UpstreamError::Request(e) => e.is_timeout() || e.is_connect(),
            UpstreamError::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || *status == reqwest::StatusCode::BAD_GATEWAY
                    || *status == reqwest::StatusCode::SERVICE_UNAVAILABLE
                    || *status == reqwest::StatusCode::GATEWAY_TIMEOUT
            }
            UpstreamError::Unavailable(_)
            | UpstreamError::InvalidResponse(_)
            | UpstreamError::MissingApiKey => false,
        }
    }
}

/// Errors related to the in-memory vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector at position {position} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },

    #[error("query has dimension {found}, index expects {expected}")]
    QueryDimensionMismatch { expected: usize, found: usize },

    #[error("index is empty")]
    EmptyIndex,

    #[error("k must be at least 1")]
    InvalidLimit,
}

/// Pipeline stage that exceeded its time bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Summarize,
    Embed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Summarize => write!(f, "image summarization"),
            Stage::Embed => write!(f, "embedding"),
        }
    }
}

/// Errors surfaced by the retriever to its caller.
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("retriever is not ready: ingest a document first")]
    NotReady,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("image summarization failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

/// Errors from a question-answering session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    #[error("answer generation failed: {0}")]
    Answer(#[source] UpstreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_retryable() {
        assert!(UpstreamError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(
            UpstreamError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            UpstreamError::Status {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                body: "quota".to_string(),
            }
            .is_retryable()
        );
        assert!(!UpstreamError::MissingApiKey.is_retryable());
        assert!(!UpstreamError::InvalidResponse("no candidates".to_string()).is_retryable());
    }

    #[test]
    fn test_status_classified_by_code_not_body() {
        let err = UpstreamError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "image 503 is unavailable: connection timeout".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!UpstreamError::Unavailable("503 timeout connection".to_string()).is_retryable());
    }

    #[test]
    fn test_retriever_error_display() {
        let err = RetrieverError::Timeout {
            stage: Stage::Summarize,
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "image summarization timed out after 5s");
    }
}
