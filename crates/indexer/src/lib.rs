//! # ACT Indexer
//!
//! Turns a paired dataset into a persisted retrieval index.
//!
//! ## Pipeline
//!
//! ```text
//! Directory of <name>.pas / <name>.cs
//!     │
//!     ├──> pair_directory
//!     │      └─> paired_data.jsonl  {input, output}
//!     │
//!     ├──> read_dataset (incomplete records skipped)
//!     │      └─> Vec<Example>
//!     │
//!     └──> IndexBuilder (truncate → embed → ordered commit)
//!            └─> index.bin + metadata.jsonl + manifest.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use act_indexer::{read_dataset, IndexBuilder};
//! use act_vector_store::{IndexLayout, StubEmbedder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = read_dataset("paired_data.jsonl").await?;
//!     let builder = IndexBuilder::new(Arc::new(StubEmbedder::new(64)));
//!     let outcome = builder
//!         .build_and_save(dataset.examples, &IndexLayout::new(".act/index"))
//!         .await?;
//!
//!     println!("Indexed {} of {} examples", outcome.stats.indexed, outcome.stats.total);
//!     Ok(())
//! }
//! ```

mod builder;
mod dataset;
mod error;
mod pairing;
mod stats;

pub use builder::{
    BuildOptions, BuildOutcome, IndexBuilder, DEFAULT_BUILD_CONCURRENCY, DEFAULT_MAX_INPUT_CHARS,
};
pub use dataset::{dataset_fingerprint, read_dataset, write_dataset, Dataset};
pub use error::{IndexerError, Result};
pub use pairing::{
    pair_directory, PairingOptions, PairingReport, DEFAULT_SOURCE_EXT, DEFAULT_TARGET_EXT,
};
pub use stats::{BuildFailure, BuildStats};
