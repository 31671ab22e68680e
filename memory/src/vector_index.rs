//! # Flat Vector Index
//!
//! Exact nearest-neighbor index over fixed-width `f32` vectors keyed by turn id.
//!
//! The index is a derived cache of the turns table: every entry comes from a committed
//! row, and the whole index can be regenerated with [`FlatIndex::rebuild_from_store`].
//! Search is a full scan with squared Euclidean distance over the raw vectors (no
//! normalization), which is adequate for session-memory volumes.
//!
//! ## On-disk format
//!
//! A single bincode document holding a magic tag, a format version, the dimension,
//! the ids and the row-major vector data. [`FlatIndex::persist`] writes a sibling
//! temporary file and renames it over the previous one, so a reader never observes a
//! partially written index.

use crate::error::{IndexError, MemoryError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use storage::{decode_embedding, TurnRepository};
use tracing::{debug, info};

const INDEX_MAGIC: [u8; 4] = *b"TMIX";
const INDEX_VERSION: u32 = 1;

/// One search hit: turn id and its squared L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: i64,
    pub distance: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    magic: [u8; 4],
    version: u32,
    dim: u64,
    ids: Vec<i64>,
    vectors: Vec<f32>,
}

/// In-memory flat index. Vectors are stored contiguously, `dim` floats per id.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<i64>,
    vectors: Vec<f32>,
    members: HashSet<i64>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of width `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
            members: HashSet::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.members.contains(&id)
    }

    /// Indexed ids in insertion order.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Highest indexed id, `None` when empty.
    pub fn max_id(&self) -> Option<i64> {
        self.ids.iter().copied().max()
    }

    /// Inserts one vector. A wrong width or an id that is already present is
    /// rejected and leaves the index untouched.
    pub fn add(&mut self, id: i64, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::Dimension {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        if !self.members.insert(id) {
            return Err(IndexError::DuplicateId(id));
        }
        self.ids.push(id);
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    /// Returns up to `k` nearest ids, closest first; equal distances order by id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::Dimension {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .ids
            .iter()
            .zip(self.vectors.chunks_exact(self.dim.max(1)))
            .map(|(&id, vector)| Neighbor {
                id,
                distance: squared_l2(query, vector),
            })
            .collect();

        let order = |a: &Neighbor, b: &Neighbor| {
            a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id))
        };
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, order);
            hits.truncate(k);
        }
        hits.sort_by(order);
        Ok(hits)
    }

    /// Serializes the whole index to `path`, replacing any previous file.
    pub async fn persist(&self, path: &Path) -> Result<(), IndexError> {
        let file = IndexFile {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            dim: self.dim as u64,
            ids: self.ids.clone(),
            vectors: self.vectors.clone(),
        };
        let bytes = bincode::serialize(&file)?;

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), entries = self.len(), bytes = bytes.len(), "Persisted vector index");
        Ok(())
    }

    /// Reads an index previously written by [`persist`](Self::persist).
    pub async fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = tokio::fs::read(path).await?;
        let file: IndexFile = bincode::deserialize(&bytes)?;

        if file.magic != INDEX_MAGIC {
            return Err(IndexError::Corrupt("bad magic".to_string()));
        }
        if file.version != INDEX_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported version {}",
                file.version
            )));
        }
        let dim = usize::try_from(file.dim)
            .map_err(|_| IndexError::Corrupt(format!("dimension {} out of range", file.dim)))?;
        if dim == 0 {
            return Err(IndexError::Corrupt("zero dimension".to_string()));
        }
        let expected_floats = file.ids.len().checked_mul(dim).ok_or_else(|| {
            IndexError::Corrupt(format!("{} ids at dimension {} overflow", file.ids.len(), dim))
        })?;
        if file.vectors.len() != expected_floats {
            return Err(IndexError::Corrupt(format!(
                "{} ids but {} floats at dimension {}",
                file.ids.len(),
                file.vectors.len(),
                dim
            )));
        }

        let mut index = Self::new(dim);
        for (id, vector) in file.ids.iter().zip(file.vectors.chunks_exact(dim)) {
            index.add(*id, vector).map_err(|e| IndexError::Corrupt(e.to_string()))?;
        }

        info!(path = %path.display(), entries = index.len(), dim, "Loaded vector index");
        Ok(index)
    }

    /// Builds a fresh index of width `dim` from every embedding in the store.
    ///
    /// A stored embedding of another width means the database was written with a
    /// different provider configuration; that is reported, never truncated or padded.
    pub async fn rebuild_from_store(store: &TurnRepository, dim: usize) -> Result<Self, MemoryError> {
        let rows = store.select_all_embeddings().await?;
        let mut index = Self::new(dim);
        index.ids.reserve(rows.len());
        index.vectors.reserve(rows.len() * dim);

        for row in rows {
            let vector = decode_embedding(&row.embedding)?;
            index.add(row.id, &vector)?;
        }

        info!(entries = index.len(), dim, "Rebuilt vector index from store");
        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
