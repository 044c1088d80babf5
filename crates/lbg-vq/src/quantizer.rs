use crate::distance::nearest;
use crate::{Codebook, Result, VectorStore, VqError};

/// Query-only facade over a finished codebook.
///
/// Encoding uses the same metric and tie-break as training's assignment
/// step, so a training vector encodes to the cluster it was last
/// assigned to.
#[derive(Debug, Clone)]
pub struct Quantizer {
    codebook: Codebook,
}

impl Quantizer {
    pub fn new(codebook: Codebook) -> Self {
        Self { codebook }
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn into_codebook(self) -> Codebook {
        self.codebook
    }

    /// Index of the codeword nearest to `vector`.
    ///
    /// # Errors
    ///
    /// [`VqError::DimensionMismatch`] if `vector` has the wrong length,
    /// [`VqError::EmptyCodebook`] if there is nothing to encode against.
    pub fn encode(&self, vector: &[f64]) -> Result<usize> {
        self.encode_with_distance(vector).map(|(index, _)| index)
    }

    /// Nearest codeword index together with its squared distance.
    pub fn encode_with_distance(&self, vector: &[f64]) -> Result<(usize, f64)> {
        if vector.len() != self.codebook.dimension() {
            return Err(VqError::DimensionMismatch {
                expected: self.codebook.dimension(),
                got: vector.len(),
            });
        }
        nearest(vector, self.codebook.iter()).ok_or(VqError::EmptyCodebook)
    }

    /// The codeword at `index`.
    pub fn decode(&self, index: usize) -> Result<&[f64]> {
        self.codebook.get(index)
    }

    /// Encode every vector in order. The first failure aborts the batch.
    pub fn encode_batch<V: AsRef<[f64]>>(&self, vectors: &[V]) -> Result<Vec<usize>> {
        vectors.iter().map(|v| self.encode(v.as_ref())).collect()
    }

    /// Decode every index in order. The first failure aborts the batch.
    pub fn decode_batch(&self, indices: &[usize]) -> Result<Vec<&[f64]>> {
        indices.iter().map(|&i| self.decode(i)).collect()
    }

    /// Replace each vector by its nearest codeword.
    pub fn reconstruct<V: AsRef<[f64]>>(&self, vectors: &[V]) -> Result<Vec<Vec<f64>>> {
        vectors
            .iter()
            .map(|v| {
                let index = self.encode(v.as_ref())?;
                self.decode(index).map(<[f64]>::to_vec)
            })
            .collect()
    }

    /// Mean squared quantization error over `store`; 0 for an empty store.
    pub fn mean_distortion(&self, store: &VectorStore) -> Result<f64> {
        if store.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0f64;
        for v in store.iter() {
            total += self.encode_with_distance(v)?.1;
        }
        Ok(total / store.len() as f64)
    }
}

impl From<Codebook> for Quantizer {
    fn from(codebook: Codebook) -> Self {
        Self::new(codebook)
    }
}
