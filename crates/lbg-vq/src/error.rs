//! Error types for the vector quantization engine.

use thiserror::Error;

/// Errors produced by training, quantization, block decomposition and
/// codebook persistence.
///
/// Every variant is local and deterministic: retrying the same call with
/// the same inputs fails the same way.
#[derive(Debug, Error)]
pub enum VqError {
    /// Two operands had different vector dimensions.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A codeword index outside `[0, size)`.
    #[error("codeword index {index} out of range for codebook of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// The codebook would grow past its configured target size.
    #[error("codebook capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },

    /// Nearest-codeword search against a codebook with no codewords.
    #[error("codebook is empty")]
    EmptyCodebook,

    /// A training parameter violated its precondition.
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    /// A pixel buffer that does not describe a valid grayscale image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Malformed codebook or vector file.
    #[error("format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
