use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::paths::{IndexLayout, IndexManifest};
use crate::types::{Example, Hit, RetrievalResult};

/// Vector index and metadata kept in lockstep: position `i` of one is position `i` of the
/// other. The only way to grow the store is [`ExampleStore::push`], which advances both or
/// neither.
#[derive(Debug, Clone)]
pub struct ExampleStore {
    index: FlatIndex,
    metadata: MetadataStore,
    embedding_model: String,
}

impl ExampleStore {
    pub fn new(dimension: usize, embedding_model: impl Into<String>) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            metadata: MetadataStore::new(),
            embedding_model: embedding_model.into(),
        }
    }

    pub fn from_parts(
        index: FlatIndex,
        metadata: MetadataStore,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(VectorStoreError::Misaligned {
                vectors: index.len(),
                examples: metadata.len(),
            });
        }
        Ok(Self {
            index,
            metadata,
            embedding_model: embedding_model.into(),
        })
    }

    /// Append one example with its vector. Returns the new position.
    pub fn push(&mut self, example: Example, vector: &[f32]) -> Result<usize> {
        // `add` validates before mutating, so a rejected vector leaves both halves untouched.
        self.index.add(&[vector])?;
        Ok(self.metadata.append(example))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[must_use]
    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[must_use]
    pub const fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    #[must_use]
    pub fn into_parts(self) -> (FlatIndex, MetadataStore) {
        (self.index, self.metadata)
    }

    /// k nearest examples to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        let neighbors = self.index.search(query, k)?;
        self.resolve(neighbors)
    }

    /// Join `(position, distance)` pairs against the metadata, keeping their order.
    pub fn resolve(&self, neighbors: Vec<(usize, f32)>) -> Result<RetrievalResult> {
        let hits = neighbors
            .into_iter()
            .map(|(position, distance)| {
                Ok(Hit {
                    position,
                    distance,
                    example: self.metadata.get(position)?.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RetrievalResult { hits })
    }

    #[must_use]
    pub fn manifest(&self) -> IndexManifest {
        IndexManifest::new(&self.embedding_model, self.dimension(), self.len())
    }

    pub async fn save(&self, layout: &IndexLayout, dataset_sha256: Option<String>) -> Result<()> {
        log::info!(
            "Saving {} examples to {}",
            self.len(),
            layout.dir().display()
        );
        self.index.save(layout.index_path()).await?;
        self.metadata.save(layout.metadata_path()).await?;
        let mut manifest = self.manifest();
        manifest.dataset_sha256 = dataset_sha256;
        manifest.save(layout.manifest_path()).await?;
        Ok(())
    }

    pub async fn load(layout: &IndexLayout) -> Result<Self> {
        log::info!("Loading index from {}", layout.dir().display());
        let index = FlatIndex::load(layout.index_path()).await?;
        let metadata = MetadataStore::load(layout.metadata_path()).await?;
        let manifest = IndexManifest::load(layout.manifest_path()).await?;

        if manifest.dimension != index.dimension() || manifest.examples != index.len() {
            return Err(VectorStoreError::CorruptIndex {
                path: layout.manifest_path(),
                reason: format!(
                    "manifest describes {}x{} but index holds {}x{}",
                    manifest.examples,
                    manifest.dimension,
                    index.len(),
                    index.dimension()
                ),
            });
        }
        let store = Self::from_parts(index, metadata, manifest.embedding_model)?;
        log::info!(
            "Loaded {} examples (dimension {}, model {})",
            store.len(),
            store.dimension(),
            store.embedding_model()
        );
        Ok(store)
    }
}
