use crate::error::VecError;

/// Match is a single result from a vector similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Identifier of the matched vector. For the voice library this is the
    /// clip filename relative to the library root.
    pub id: String,

    /// Distance between the query and matched vector.
    /// Lower values indicate higher similarity.
    pub distance: f32,
}

/// VecIndex is the interface for nearest-neighbor search over dense float32
/// vectors.
///
/// Searches take `&self` and must be safe to run concurrently with each other.
pub trait VecIndex: Send + Sync {
    /// Add or replace a vector with the given ID.
    fn insert(&self, id: &str, vector: &[f32]) -> Result<(), VecError>;

    /// Return the top-k nearest vectors to the query, ordered by ascending
    /// distance (closest first). An empty index yields an empty vec.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError>;

    /// Vector dimension the index accepts, once known.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Return the number of vectors in the index.
    fn len(&self) -> usize;

    /// Return true if the index contains no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
