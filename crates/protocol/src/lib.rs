use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const API_SCHEMA_VERSION: u32 = 1;

/// Stable machine-readable error codes carried in [`ErrorEnvelope::code`].
pub mod codes {
    pub const EMPTY_INPUT: &str = "empty_input";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const RETRIEVAL_UNAVAILABLE: &str = "retrieval_unavailable";
    pub const DIMENSION_MISMATCH: &str = "dimension_mismatch";
    pub const INDEX_OUT_OF_RANGE: &str = "index_out_of_range";
    pub const GENERATION_FAILED: &str = "generation_failed";
    pub const INTERNAL: &str = "internal";
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslateRequest {
    /// Source snippet to translate. `delphi_code` is accepted for older clients.
    #[serde(alias = "delphi_code")]
    pub source_code: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslateResponse {
    pub translated_code: String,
    /// Copy of `translated_code` under the name browser clients of the first API read.
    #[serde(default)]
    pub translated_csharp: String,
    pub examples_used: usize,
    pub elapsed_ms: u64,
}

impl TranslateResponse {
    pub fn new(translated_code: String, examples_used: usize, elapsed_ms: u64) -> Self {
        Self {
            translated_csharp: translated_code.clone(),
            translated_code,
            examples_used,
            elapsed_ms,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    /// Whether repeating the same request later may succeed.
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            retryable,
            hint: default_hint(code).map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorEnvelope,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: String,
    pub schema_version: u32,
    pub examples: usize,
    pub dimension: usize,
    pub embedding_model: String,
}

fn default_hint(code: &str) -> Option<&'static str> {
    match code {
        codes::EMPTY_INPUT => Some("Send a non-blank source_code field."),
        codes::INVALID_REQUEST => {
            Some("The body must be a JSON object with a string source_code field.")
        }
        codes::UNAUTHORIZED => Some("Include Authorization: Bearer <token>."),
        codes::RETRIEVAL_UNAVAILABLE | codes::GENERATION_FAILED => {
            Some("An upstream model service failed; retry with backoff.")
        }
        codes::DIMENSION_MISMATCH => {
            Some("The index was built with a different embedding model; rebuild it.")
        }
        codes::INDEX_OUT_OF_RANGE => Some("The persisted index is corrupted; rebuild it."),
        _ => None,
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
