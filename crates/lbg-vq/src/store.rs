//! Read-only training corpus of fixed-dimension vectors.

use crate::{Result, VqError};

/// An ordered collection of `N` vectors, all of dimension `D`.
///
/// The dimension is checked once at construction; every consumer may
/// rely on it afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorStore {
    dim: usize,
    vectors: Vec<Vec<f64>>,
}

impl VectorStore {
    /// Build a store, taking the dimension from the first vector.
    ///
    /// # Errors
    ///
    /// Returns [`VqError::DimensionMismatch`] for the first vector whose
    /// length differs from the first vector's.
    pub fn new(vectors: Vec<Vec<f64>>) -> Result<Self> {
        let dim = vectors.first().map_or(0, Vec::len);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(VqError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self { dim, vectors })
    }

    /// An empty store with a known dimension.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    /// Build a store from a flat row-major buffer of `data.len() / dim` vectors.
    ///
    /// # Errors
    ///
    /// Returns [`VqError::DimensionMismatch`] if `dim == 0` or
    /// `data.len()` is not a multiple of `dim`.
    pub fn from_flat(data: &[f64], dim: usize) -> Result<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(VqError::DimensionMismatch {
                expected: dim,
                got: data.len(),
            });
        }
        let vectors = data.chunks_exact(dim).map(<[f64]>::to_vec).collect();
        Ok(Self { dim, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension `D` shared by every vector.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.vectors.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.vectors.iter().map(Vec::as_slice)
    }

    /// Coordinate-wise mean of every vector, or `None` for an empty store.
    pub fn centroid(&self) -> Option<Vec<f64>> {
        mean_of(self.dim, self.iter())
    }
}

/// Coordinate-wise mean with a fixed left-to-right accumulation order,
/// so repeated runs produce bit-identical results.
pub(crate) fn mean_of<'a, I>(dim: usize, vectors: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum = vec![0.0f64; dim];
    let mut count = 0usize;
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v) {
            *s += *x;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    sum.iter_mut().for_each(|s| *s /= n);
    Some(sum)
}
