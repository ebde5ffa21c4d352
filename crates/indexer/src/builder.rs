use crate::dataset::dataset_fingerprint;
use crate::error::{IndexerError, Result};
use crate::stats::BuildStats;
use act_vector_store::{
    Embedder, EmbeddingResult, Example, ExampleStore, IndexLayout, VectorStoreError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Roughly 8k tokens of source code.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 24_000;
pub const DEFAULT_BUILD_CONCURRENCY: usize = 4;

const PROGRESS_EVERY: usize = 100;

#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Inputs are cut to this many characters before embedding
    pub max_input_chars: usize,
    /// Embedding calls allowed in flight at once
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            concurrency: DEFAULT_BUILD_CONCURRENCY,
        }
    }
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub store: ExampleStore,
    pub stats: BuildStats,
    pub dataset_sha256: String,
}

/// Embeds a dataset and builds an aligned [`ExampleStore`] from it.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    options: BuildOptions,
}

struct Prepared {
    ordinal: usize,
    example: Example,
    truncated: bool,
}

struct Embedded {
    prepared: Prepared,
    result: EmbeddingResult<Vec<f32>>,
}

/// Accumulates embedding results in dataset order. Each commit either advances the store
/// by one aligned entry or records one failure.
struct BuildFold {
    store: ExampleStore,
    stats: BuildStats,
}

impl BuildFold {
    fn commit(&mut self, embedded: Embedded) -> Result<()> {
        let Prepared {
            ordinal,
            example,
            truncated,
        } = embedded.prepared;

        let vector = match embedded.result {
            Ok(vector) => vector,
            Err(err) => {
                log::warn!("Skipping example {ordinal}: {err}");
                self.stats.add_failure(ordinal, err.to_string());
                return Ok(());
            }
        };

        match self.store.push(example, &vector) {
            Ok(_) => {
                self.stats.add_indexed(truncated);
                Ok(())
            }
            Err(VectorStoreError::DimensionMismatch { expected, actual }) => {
                log::warn!(
                    "Skipping example {ordinal}: embedding has dimension {actual}, index expects {expected}"
                );
                self.stats.add_failure(
                    ordinal,
                    format!("unexpected embedding dimension: expected {expected}, got {actual}"),
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            options: BuildOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the store in memory.
    ///
    /// A failed embedding drops that example from both halves of the store and the build
    /// continues. Up to `concurrency` embeddings run at once; finished ones wait in a
    /// reorder buffer until every earlier example has been committed.
    pub async fn build(&self, dataset: Vec<Example>) -> Result<BuildOutcome> {
        let start = Instant::now();
        let total = dataset.len();
        let dataset_sha256 = dataset_fingerprint(&dataset);
        let concurrency = self.options.concurrency.max(1);

        log::info!(
            "Embedding {total} examples with {} (concurrency {concurrency}, max {} chars)",
            self.embedder.model_id(),
            self.options.max_input_chars
        );

        let mut fold = BuildFold {
            store: ExampleStore::new(self.embedder.dimension(), self.embedder.model_id()),
            stats: BuildStats::new(total),
        };
        let mut queue = dataset.into_iter().enumerate();
        let mut in_flight: JoinSet<Embedded> = JoinSet::new();
        let mut reorder: BTreeMap<usize, Embedded> = BTreeMap::new();
        let mut next_commit = 0usize;

        loop {
            while in_flight.len() < concurrency {
                let Some((ordinal, example)) = queue.next() else {
                    break;
                };
                let prepared = self.prepare(ordinal, example);
                let embedder = Arc::clone(&self.embedder);
                in_flight.spawn(async move {
                    let result = embedder.embed(&prepared.example.input).await;
                    Embedded { prepared, result }
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let embedded = joined
                .map_err(|err| IndexerError::Other(format!("embedding task failed: {err}")))?;
            reorder.insert(embedded.prepared.ordinal, embedded);

            while let Some(ready) = reorder.remove(&next_commit) {
                fold.commit(ready)?;
                next_commit += 1;
                if next_commit % PROGRESS_EVERY == 0 {
                    log::info!("Embedded {next_commit}/{total} examples");
                }
            }
        }

        debug_assert!(reorder.is_empty());
        let BuildFold { store, mut stats } = fold;
        stats.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug_assert!(stats.is_settled());
        debug_assert_eq!(store.len(), store.metadata().len());

        log::info!(
            "Indexed {}/{} examples ({} failed, {} truncated) in {} ms",
            stats.indexed,
            stats.total,
            stats.failed,
            stats.truncated,
            stats.time_ms
        );
        Ok(BuildOutcome {
            store,
            stats,
            dataset_sha256,
        })
    }

    /// Build, then persist index, metadata and manifest under `layout`.
    pub async fn build_and_save(
        &self,
        dataset: Vec<Example>,
        layout: &IndexLayout,
    ) -> Result<BuildOutcome> {
        let outcome = self.build(dataset).await?;
        outcome
            .store
            .save(layout, Some(outcome.dataset_sha256.clone()))
            .await?;
        Ok(outcome)
    }

    fn prepare(&self, ordinal: usize, mut example: Example) -> Prepared {
        let truncated = example.truncate_input(self.options.max_input_chars);
        Prepared {
            ordinal,
            example,
            truncated,
        }
    }
}
