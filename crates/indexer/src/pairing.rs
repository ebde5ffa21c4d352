use crate::error::{IndexerError, Result};
use act_vector_store::Example;
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_EXT: &str = "pas";
pub const DEFAULT_TARGET_EXT: &str = "cs";

#[derive(Debug, Clone)]
pub struct PairingOptions {
    pub source_ext: String,
    pub target_ext: String,
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self {
            source_ext: DEFAULT_SOURCE_EXT.to_string(),
            target_ext: DEFAULT_TARGET_EXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairingReport {
    /// Paired examples, sorted by relative stem
    pub examples: Vec<Example>,
    /// Files with no counterpart of the other extension
    pub unpaired: Vec<PathBuf>,
    /// Pairs dropped because one side was empty after trimming
    pub empty: usize,
}

#[derive(Default)]
struct Slot {
    source: Option<PathBuf>,
    target: Option<PathBuf>,
}

/// Pair `<stem>.<source_ext>` with `<stem>.<target_ext>` under `dir`.
///
/// Files are matched by their path relative to `dir` minus the extension, so
/// `a/Unit1.pas` pairs with `a/Unit1.cs` but not with `b/Unit1.cs`.
pub fn pair_directory(dir: impl AsRef<Path>, options: &PairingOptions) -> Result<PairingReport> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(IndexerError::InvalidPath(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut slots: BTreeMap<PathBuf, Slot> = BTreeMap::new();
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(false).git_global(false);

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to read entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let is_source = ext.eq_ignore_ascii_case(&options.source_ext);
        let is_target = ext.eq_ignore_ascii_case(&options.target_ext);
        if !is_source && !is_target {
            continue;
        }

        let rel = path.strip_prefix(dir).unwrap_or(path).with_extension("");
        let slot = slots.entry(rel).or_default();
        if is_source {
            slot.source = Some(path.to_path_buf());
        } else {
            slot.target = Some(path.to_path_buf());
        }
    }

    let mut report = PairingReport::default();
    for (stem, slot) in slots {
        match (slot.source, slot.target) {
            (Some(source), Some(target)) => {
                let input = read_lossy(&source)?;
                let output = read_lossy(&target)?;
                if input.is_empty() || output.is_empty() {
                    log::debug!("Skipping empty pair {}", stem.display());
                    report.empty += 1;
                    continue;
                }
                report.examples.push(Example::new(input, output));
            }
            (Some(lonely), None) | (None, Some(lonely)) => report.unpaired.push(lonely),
            (None, None) => {}
        }
    }

    log::info!(
        "Paired {} examples under {} ({} unpaired files, {} empty pairs)",
        report.examples.len(),
        dir.display(),
        report.unpaired.len(),
        report.empty
    );
    Ok(report)
}

/// Legacy sources are often Windows-1252; undecodable bytes become U+FFFD rather than
/// failing the pair.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}
