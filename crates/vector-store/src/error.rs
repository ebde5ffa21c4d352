use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Position {position} out of range (store holds {len} examples)")]
    IndexOutOfRange { position: usize, len: usize },

    #[error("Index holds {vectors} vectors but {examples} examples")]
    Misaligned { vectors: usize, examples: usize },

    #[error("k must be at least 1")]
    InvalidTopK,

    #[error("Corrupt index at {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Invalid record at {path}:{line}: {reason}")]
    Schema {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Failure of a single call to an embedding service.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("unexpected embedding dimension: expected {expected}, got {actual}")]
    UnexpectedDimension { expected: usize, actual: usize },
}

/// An embedding mode name that is neither `openai` nor `stub`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported embedding mode '{0}' (expected 'openai' or 'stub')")]
pub struct UnknownEmbeddingMode(pub String);
