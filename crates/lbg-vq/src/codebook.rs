use serde::{Deserialize, Serialize};

use crate::{Result, VqError};

/// An ordered sequence of codewords, all of dimension `dim`.
///
/// A codeword's position is its public identity: the index `encode`
/// returns and `decode` consumes. Only the trainer grows or rewrites a
/// codebook; everyone else sees it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawCodebook")]
pub struct Codebook {
    dim: usize,
    /// Upper bound on the number of codewords. Equal to `codewords.len()`
    /// for codebooks built outside the trainer.
    #[serde(skip)]
    capacity: usize,
    codewords: Vec<Vec<f64>>,
}

// Capacity is a training-time bound, not part of a codebook's identity.
impl PartialEq for Codebook {
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim && self.codewords == other.codewords
    }
}

/// Unvalidated wire form; deserialization goes through [`Codebook::from_codewords`].
#[derive(Deserialize)]
struct RawCodebook {
    dim: usize,
    codewords: Vec<Vec<f64>>,
}

impl TryFrom<RawCodebook> for Codebook {
    type Error = VqError;

    fn try_from(raw: RawCodebook) -> Result<Self> {
        Codebook::from_codewords(raw.dim, raw.codewords)
    }
}

impl Codebook {
    /// An empty codebook that may grow to `capacity` codewords of dimension `dim`.
    pub(crate) fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            capacity,
            codewords: Vec::with_capacity(capacity),
        }
    }

    /// Build a finished codebook from explicit codewords.
    ///
    /// # Errors
    ///
    /// Returns [`VqError::DimensionMismatch`] if any codeword's length
    /// differs from `dim`.
    pub fn from_codewords(dim: usize, codewords: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = codewords.iter().find(|c| c.len() != dim) {
            return Err(VqError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self {
            dim,
            capacity: codewords.len(),
            codewords,
        })
    }

    /// Number of codewords `K`.
    pub fn size(&self) -> usize {
        self.codewords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codewords.is_empty()
    }

    /// Dimension `D` of every codeword.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Codeword at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`VqError::IndexOutOfRange`] if `index >= size()`.
    pub fn get(&self, index: usize) -> Result<&[f64]> {
        self.codewords
            .get(index)
            .map(Vec::as_slice)
            .ok_or(VqError::IndexOutOfRange {
                index,
                size: self.codewords.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.codewords.iter().map(Vec::as_slice)
    }

    /// Overwrite the codeword at `index`.
    pub(crate) fn replace(&mut self, index: usize, codeword: Vec<f64>) -> Result<()> {
        self.check_dim(&codeword)?;
        let size = self.codewords.len();
        let slot = self
            .codewords
            .get_mut(index)
            .ok_or(VqError::IndexOutOfRange { index, size })?;
        *slot = codeword;
        Ok(())
    }

    /// Append a codeword at index `size()`.
    pub(crate) fn append(&mut self, codeword: Vec<f64>) -> Result<()> {
        self.check_dim(&codeword)?;
        if self.codewords.len() >= self.capacity {
            return Err(VqError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.codewords.push(codeword);
        Ok(())
    }

    /// Freeze the codebook at its current size.
    pub(crate) fn seal(mut self) -> Self {
        self.capacity = self.codewords.len();
        self
    }

    fn check_dim(&self, codeword: &[f64]) -> Result<()> {
        if codeword.len() != self.dim {
            return Err(VqError::DimensionMismatch {
                expected: self.dim,
                got: codeword.len(),
            });
        }
        Ok(())
    }
}
