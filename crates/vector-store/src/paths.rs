use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ACT_DIR_NAME: &str = ".act";
pub const INDEX_DIR_NAME: &str = "index";

pub const INDEX_FILE_NAME: &str = "index.bin";
pub const METADATA_FILE_NAME: &str = "metadata.jsonl";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const INDEX_MANIFEST_SCHEMA_VERSION: u32 = 1;

#[must_use]
pub fn default_index_dir_rel() -> PathBuf {
    PathBuf::from(ACT_DIR_NAME).join(INDEX_DIR_NAME)
}

/// File layout of one persisted index directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    dir: PathBuf,
}

impl IndexLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        Self::new(root.join(default_index_dir_rel()))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE_NAME)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.index_path().is_file() && self.metadata_path().is_file()
    }
}

/// Provenance written next to the index so a serving process can detect model skew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub schema_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub examples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_sha256: Option<String>,
}

impl IndexManifest {
    pub fn new(embedding_model: impl Into<String>, dimension: usize, examples: usize) -> Self {
        Self {
            schema_version: INDEX_MANIFEST_SCHEMA_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            examples,
            dataset_sha256: None,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let manifest: Self = serde_json::from_slice(&bytes)?;
        if manifest.schema_version != INDEX_MANIFEST_SCHEMA_VERSION {
            return Err(VectorStoreError::CorruptIndex {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported manifest schema_version {} (expected {INDEX_MANIFEST_SCHEMA_VERSION})",
                    manifest.schema_version
                ),
            });
        }
        Ok(manifest)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
