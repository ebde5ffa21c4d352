use crate::error::{Result, VectorStoreError};
use ndarray::{Array2, ArrayView1, Axis, Zip};
use std::cmp::Ordering;
use std::path::Path;

const INDEX_MAGIC: &[u8; 4] = b"AFI1";
// magic + u32 dimension + u64 count
const HEADER_LEN: usize = 16;

/// Exact L2 nearest-neighbor index (brute force over a dense row-major matrix).
///
/// Row `i` is the vector appended `i`-th; positions never move because the index is
/// append-only.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimension)),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Get number of vectors in index
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    /// Check if index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn vector(&self, position: usize) -> Option<ArrayView1<'_, f32>> {
        (position < self.len()).then(|| self.vectors.row(position))
    }

    /// Append vectors in order. The batch is rejected as a whole if any vector has the
    /// wrong dimension.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        let dimension = self.dimension();
        if let Some(bad) = vectors
            .iter()
            .map(AsRef::as_ref)
            .find(|v| v.len() != dimension)
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if vectors.is_empty() {
            return Ok(());
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            flat.extend_from_slice(vector.as_ref());
        }
        let batch = Array2::from_shape_vec((vectors.len(), dimension), flat).map_err(|_| {
            VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: 0,
            }
        })?;
        self.vectors
            .append(Axis(0), batch.view())
            .map_err(|_| VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: batch.ncols(),
            })
    }

    /// Search for the k nearest vectors by squared Euclidean distance.
    /// Returns (position, distance) ascending by distance, ties by lower position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidTopK);
        }
        if query.len() != self.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .outer_iter()
            .enumerate()
            .map(|(position, row)| (position, squared_l2(row, query)))
            .collect();

        let k = k.min(scored.len());
        if k == 0 {
            return Ok(scored);
        }
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, compare_hits);
            scored.truncate(k);
        }
        scored.sort_by(compare_hits);
        Ok(scored)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = self.encode();
        let tmp = path.with_extension("bin.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::debug!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Self::decode(&bytes).map_err(|reason| VectorStoreError::CorruptIndex {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        out.extend_from_slice(INDEX_MAGIC);
        #[allow(clippy::cast_possible_truncation)]
        let dim = self.dimension() as u32;
        out.extend_from_slice(&dim.to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.vectors {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_LEN || &bytes[0..4] != INDEX_MAGIC {
            return Err("missing index header".to_string());
        }
        let dim = u32::from_le_bytes(read_array(&bytes[4..8])) as usize;
        let count = usize::try_from(u64::from_le_bytes(read_array(&bytes[8..16])))
            .map_err(|_| "vector count overflows usize".to_string())?;
        let expected_len = count
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| "header describes an impossible size".to_string())?;
        if bytes.len() != expected_len {
            return Err(format!(
                "expected {expected_len} bytes for {count}x{dim} vectors, found {}",
                bytes.len()
            ));
        }

        let data: Vec<f32> = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(read_array(chunk)))
            .collect();
        let vectors = Array2::from_shape_vec((count, dim), data).map_err(|e| e.to_string())?;
        Ok(Self { vectors })
    }
}

fn squared_l2(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    Zip::from(a).and(b).fold(0.0_f32, |acc, &x, &y| {
        let d = x - y;
        d.mul_add(d, acc)
    })
}

fn compare_hits(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
