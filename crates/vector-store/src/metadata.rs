use crate::error::{Result, VectorStoreError};
use crate::types::Example;
use std::path::Path;

/// Examples in index position order, persisted as JSON lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    examples: Vec<Example>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, example: Example) -> usize {
        self.examples.push(example);
        self.examples.len() - 1
    }

    pub fn get(&self, position: usize) -> Result<&Example> {
        self.examples
            .get(position)
            .ok_or(VectorStoreError::IndexOutOfRange {
                position,
                len: self.examples.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut bytes = Vec::new();
        for example in &self.examples {
            serde_json::to_writer(&mut bytes, example)?;
            bytes.push(b'\n');
        }
        let tmp = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Every non-blank line must decode to an [`Example`]; the first bad line fails the load.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let mut examples = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let example: Example =
                serde_json::from_str(line).map_err(|err| VectorStoreError::Schema {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: err.to_string(),
                })?;
            examples.push(example);
        }
        Ok(Self { examples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn metadata_roundtrip_and_lookup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metadata.jsonl");

        let mut store = MetadataStore::new();
        assert_eq!(store.append(Example::new("alpha;", "Alpha();")), 0);
        assert_eq!(store.append(Example::new("beta\nline", "Beta(\"x\");")), 1);
        store.save(&path).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw.lines().count(), 2);

        let loaded = MetadataStore::load(&path).await.unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.get(1).unwrap().input, "beta\nline");
    }

    #[test]
    fn get_out_of_range_fails() {
        let mut store = MetadataStore::new();
        store.append(Example::new("a", "b"));
        let err = store.get(1).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::IndexOutOfRange {
                position: 1,
                len: 1
            }
        ));
    }

    #[tokio::test]
    async fn load_reports_line_of_bad_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metadata.jsonl");
        tokio::fs::write(
            &path,
            "{\"input\":\"a\",\"output\":\"b\"}\n\n{\"input\":\"c\"}\n",
        )
        .await
        .unwrap();

        match MetadataStore::load(&path).await {
            Err(VectorStoreError::Schema { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("output"), "{reason}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
