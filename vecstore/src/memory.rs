use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cosine::cosine_distance;
use crate::error::VecError;
use crate::vecstore::{Match, VecIndex};

/// In-memory VecIndex using brute-force cosine distance.
///
/// Sized for a voice library (hundreds to a few thousand clips). Entries keep
/// insertion order, so equal distances resolve to the earlier entry.
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

struct Inner {
    dim: Option<usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
}

impl MemoryIndex {
    /// Empty index; the first inserted vector fixes the dimension.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                dim: None,
                ids: Vec::new(),
                vectors: Vec::new(),
                positions: HashMap::new(),
            }),
        }
    }

    /// Empty index that only accepts vectors of `dim` elements.
    pub fn with_dimension(dim: usize) -> Self {
        let idx = Self::new();
        idx.inner.write().dim = Some(dim);
        idx
    }

    /// Snapshot of `(id, vector)` pairs in insertion order.
    pub fn entries(&self) -> Vec<(String, Vec<f32>)> {
        let inner = self.inner.read();
        inner
            .ids
            .iter()
            .cloned()
            .zip(inner.vectors.iter().cloned())
            .collect()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VecIndex for MemoryIndex {
    fn insert(&self, id: &str, vector: &[f32]) -> Result<(), VecError> {
        let mut inner = self.inner.write();
        match inner.dim {
            Some(want) if want != vector.len() => {
                return Err(VecError::DimensionMismatch {
                    got: vector.len(),
                    want,
                });
            }
            Some(_) => {}
            None => inner.dim = Some(vector.len()),
        }

        if let Some(&pos) = inner.positions.get(id) {
            inner.vectors[pos] = vector.to_vec();
        } else {
            let pos = inner.ids.len();
            inner.ids.push(id.to_string());
            inner.vectors.push(vector.to_vec());
            inner.positions.insert(id.to_string(), pos);
        }
        Ok(())
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.read().dim
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError> {
        let inner = self.inner.read();
        if inner.ids.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        if let Some(want) = inner.dim
            && want != query.len()
        {
            return Err(VecError::DimensionMismatch {
                got: query.len(),
                want,
            });
        }

        let mut results: Vec<(usize, f32)> = inner
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_distance(query, v)))
            .collect();

        // Stable sort keeps insertion order between equal distances.
        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(top_k);

        Ok(results
            .into_iter()
            .map(|(i, distance)| Match {
                id: inner.ids[i].clone(),
                distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.inner.read().ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_search() {
        let idx = MemoryIndex::new();
        idx.insert("hello.opus", &[1.0, 0.0, 0.0]).unwrap();
        idx.insert("bye.opus", &[0.0, 1.0, 0.0]).unwrap();
        idx.insert("hi.opus", &[0.9, 0.1, 0.0]).unwrap();

        let matches = idx.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "hello.opus");
        assert_eq!(matches[1].id, "hi.opus");
    }

    #[test]
    fn test_replace_keeps_position() {
        let idx = MemoryIndex::new();
        idx.insert("a", &[1.0, 0.0]).unwrap();
        idx.insert("b", &[0.0, 1.0]).unwrap();
        idx.insert("a", &[0.0, 1.0]).unwrap();
        assert_eq!(idx.len(), 2);

        // a and b are now identical; a was inserted first.
        let m = idx.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(m[0].id, "a");
        assert_eq!(idx.entries()[0], ("a".to_string(), vec![0.0, 1.0]));
    }

    #[test]
    fn test_dimension_enforced() {
        let idx = MemoryIndex::with_dimension(3);
        assert!(matches!(
            idx.insert("a", &[1.0, 0.0]),
            Err(VecError::DimensionMismatch { got: 2, want: 3 })
        ));

        let idx = MemoryIndex::new();
        idx.insert("a", &[1.0, 0.0]).unwrap();
        assert_eq!(idx.dimension(), Some(2));
        assert!(idx.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_search_empty() {
        let idx = MemoryIndex::new();
        assert!(idx.is_empty());
        assert!(idx.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_top_k_zero() {
        let idx = MemoryIndex::new();
        idx.insert("a", &[1.0]).unwrap();
        assert!(idx.search(&[1.0], 0).unwrap().is_empty());
    }
}
