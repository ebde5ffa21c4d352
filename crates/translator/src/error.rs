use act_vector_store::{EmbeddingError, VectorStoreError};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslateError>;

/// Failure of a single call to the completion service.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion service returned no choices")]
    EmptyResponse,

    #[error("completion contained no code once fences were removed")]
    BlankCode,
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("source code is empty")]
    EmptyInput,

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(#[source] EmbeddingError),

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("retrieved position {position} has no example (store holds {len})")]
    IndexOutOfRange { position: usize, len: usize },

    #[error("generation failed: {0}")]
    GenerationFailed(#[source] CompletionError),

    #[error("retrieval failed: {0}")]
    Store(#[source] VectorStoreError),
}

impl From<VectorStoreError> for TranslateError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorStoreError::IndexOutOfRange { position, len } => {
                Self::IndexOutOfRange { position, len }
            }
            VectorStoreError::Embedding(inner) => Self::RetrievalUnavailable(inner),
            other => Self::Store(other),
        }
    }
}

impl TranslateError {
    /// Stable machine-readable code, shared with the HTTP error envelope.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::RetrievalUnavailable(_) => "retrieval_unavailable",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::GenerationFailed(_) => "generation_failed",
            Self::Store(_) => "internal",
        }
    }

    /// External-dependency failures a caller may retry with backoff.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RetrievalUnavailable(_) | Self::GenerationFailed(_))
    }

    pub const fn is_bad_input(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }
}
