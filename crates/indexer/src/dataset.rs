use crate::error::{IndexerError, Result};
use act_vector_store::Example;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Examples read from a JSONL dataset, with incomplete records already dropped.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub examples: Vec<Example>,
    /// Records whose `input` or `output` was empty
    pub skipped_incomplete: usize,
}

/// Read `{"input": ..., "output": ...}` records, one per line.
///
/// Blank lines are ignored. A line that is not a JSON object with string `input` and
/// `output` fields fails the whole read; records with an empty side are skipped.
pub async fn read_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let dataset = parse_dataset(&raw, path)?;
    log::info!(
        "Read {} examples from {} ({} incomplete records skipped)",
        dataset.examples.len(),
        path.display(),
        dataset.skipped_incomplete
    );
    Ok(dataset)
}

fn parse_dataset(raw: &str, path: &Path) -> Result<Dataset> {
    let mut dataset = Dataset::default();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let example: Example =
            serde_json::from_str(line).map_err(|err| IndexerError::InvalidRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: err.to_string(),
            })?;
        if example.is_complete() {
            dataset.examples.push(example);
        } else {
            log::debug!("Skipping incomplete record at {}:{}", path.display(), idx + 1);
            dataset.skipped_incomplete += 1;
        }
    }
    Ok(dataset)
}

pub async fn write_dataset(path: impl AsRef<Path>, examples: &[Example]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut bytes = Vec::new();
    for example in examples {
        serde_json::to_writer(&mut bytes, example)?;
        bytes.push(b'\n');
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Order-sensitive sha256 over the dataset content.
pub fn dataset_fingerprint(examples: &[Example]) -> String {
    let mut hasher = Sha256::new();
    for example in examples {
        for field in [&example.input, &example.output] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}
