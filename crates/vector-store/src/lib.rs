//! # ACT Vector Store
//!
//! Exact nearest-neighbor retrieval over translated code examples.
//!
//! ## Features
//!
//! - **Exact L2 search** over a dense `ndarray` matrix, deterministic tie-breaks
//! - **Pluggable embeddings** behind the [`Embedder`] trait (OpenAI-compatible HTTP or offline stub)
//! - **Aligned persistence**: vectors (`index.bin`), examples (`metadata.jsonl`) and a manifest
//!
//! ## Architecture
//!
//! ```text
//! Example { input, output }
//!     │
//!     ├──> Embedder (HTTP / stub)
//!     │      └─> Vector[dimension]
//!     │
//!     ├──> ExampleStore::push   (one atomic step)
//!     │      ├─> FlatIndex      position i ─┐
//!     │      └─> MetadataStore  position i ─┘
//!     │
//!     └──> IndexLayout
//!            └─> index.bin / metadata.jsonl / manifest.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use act_vector_store::{Embedder, ExampleStore, IndexLayout, StubEmbedder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ExampleStore::load(&IndexLayout::new(".act/index")).await?;
//!     let embedder = StubEmbedder::new(store.dimension());
//!
//!     let query = embedder.embed("procedure Greet; begin end;").await?;
//!     for hit in store.search(&query, 3)?.hits {
//!         println!("{} ({:.3})", hit.example.input, hit.distance);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod metadata;
mod paths;
mod store;
mod types;

pub use embeddings::{
    Embedder, EmbeddingMode, EmbeddingResult, OpenAiEmbedder, OpenAiEmbedderConfig,
    StubEmbedder, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_ENDPOINT,
    DEFAULT_EMBEDDING_MODEL, STUB_MODEL_ID,
};
pub use error::{EmbeddingError, Result, UnknownEmbeddingMode, VectorStoreError};
pub use flat_index::FlatIndex;
pub use metadata::MetadataStore;
pub use paths::{
    default_index_dir_rel, IndexLayout, IndexManifest, INDEX_MANIFEST_SCHEMA_VERSION,
};
pub use store::ExampleStore;
pub use types::{truncate_chars, Example, Hit, RetrievalResult};
