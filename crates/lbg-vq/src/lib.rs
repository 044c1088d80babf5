//! # lbg-vq
//!
//! Vector quantization with codebooks trained by the LBG
//! (Linde–Buzo–Gray) binary-splitting algorithm.
//!
//! ## Pipeline
//!
//! ```text
//! supplier → VectorStore → LbgTrainer → Codebook → Quantizer
//!            (read-only)   (split +      (fixed     encode: vector → index
//!                           Lloyd)        after      decode: index → codeword
//!                                         training)
//! ```
//!
//! Training is deterministic: no randomness is involved in splitting, and
//! centroids are accumulated in a fixed order, so identical inputs give
//! bit-identical codebooks.
//!
//! ## Quick start
//!
//! ```rust
//! use lbg_vq::{train, Quantizer, VectorStore};
//!
//! let store = VectorStore::new(vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 10.0],
//!     vec![10.0, 11.0],
//! ])?;
//! let codebook = train(&store, 2, 1e-6, 50, 0.5)?;
//! let q = Quantizer::new(codebook);
//!
//! assert_eq!(q.encode(&[0.0, 0.0])?, q.encode(&[0.0, 1.0])?);
//! assert_ne!(q.encode(&[0.0, 0.0])?, q.encode(&[10.0, 10.0])?);
//! # Ok::<(), lbg_vq::VqError>(())
//! ```
//!
//! ## Modules
//!
//! - [`distance`]: squared Euclidean distortion
//! - [`store`]: the training corpus
//! - [`codebook`]: trained codewords
//! - [`config`]: training parameters, env overrides
//! - [`trainer`]: LBG split/refine training, observers, cancellation
//! - [`quantizer`]: encode / decode over a finished codebook
//! - [`blocks`]: grayscale image ⇄ block vectors
//! - [`persist`]: text files for codebooks and vectors

pub mod blocks;
pub mod codebook;
pub mod config;
pub mod distance;
pub mod error;
pub mod persist;
pub mod quantizer;
pub mod store;
pub mod trainer;

pub use codebook::Codebook;
pub use config::TrainConfig;
pub use distance::distance_sq;
pub use error::VqError;
pub use quantizer::Quantizer;
pub use store::VectorStore;
pub use trainer::{
    train, CancelToken, IterationStats, LbgTrainer, LevelReport, NoopObserver, TrainObserver,
    TrainReport,
};

pub type Result<T> = std::result::Result<T, VqError>;
