//! LBG (Linde–Buzo–Gray) codebook training.
//!
//! ## Protocol
//!
//! ```text
//! Level 1   codebook = { mean of all training vectors }
//! Repeat while size < target:
//!   Split   every codeword c → c + e, c − e   (stop appending at target)
//!   Refine  up to max_iterations Lloyd steps:
//!             assign  each vector → nearest codeword (ties → lowest index)
//!             update  each non-empty cluster → its mean
//!             stop    when |D_prev − D| / D_prev < epsilon
//! ```
//!
//! Sizes grow 1, 2, 4, … capped at the target. The perturbation vector `e`
//! is fixed, so two runs over the same inputs produce bit-identical
//! codebooks. The convergence baseline resets to +∞ at every level.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::distance::nearest;
use crate::{Codebook, Result, TrainConfig, VectorStore, VqError};

// ─────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────

/// Cooperative cancellation flag shared between a training run and its caller.
///
/// Checked before every split and every Lloyd iteration. A cancelled run
/// returns the codebook of the last fully refined level.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────

/// Statistics for one Lloyd iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStats {
    /// Codebook size of the level being refined.
    pub level_size: usize,
    /// Zero-based iteration within the level.
    pub iteration: usize,
    /// Mean squared distortion of the assignment step.
    pub distortion: f64,
    /// `|prev − current| / prev`; `None` on the first iteration of a level.
    pub relative_change: Option<f64>,
    /// Number of codewords that received no training vectors.
    pub empty_clusters: usize,
}

/// Summary of one completed split level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    /// Codebook size at this level.
    pub size: usize,
    /// Lloyd iterations run (0 for the initial centroid).
    pub iterations: usize,
    /// Mean distortion measured in the last iteration.
    pub distortion: f64,
    /// Whether refinement stopped on the epsilon criterion rather than
    /// hitting `max_iterations`.
    pub converged: bool,
    /// Empty clusters in the last iteration.
    pub empty_clusters: usize,
}

/// Result of [`LbgTrainer::train_with`].
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// The trained codebook.
    pub codebook: Codebook,
    /// One entry per completed level, starting with the size-1 level.
    pub levels: Vec<LevelReport>,
    /// `assignments[i]` is the codeword nearest to training vector `i`
    /// under the returned codebook.
    pub assignments: Vec<usize>,
    /// Mean squared distortion of `assignments`.
    pub final_distortion: f64,
    /// Set when the run stopped on a [`CancelToken`].
    pub cancelled: bool,
}

// ─────────────────────────────────────────────
// Observer
// ─────────────────────────────────────────────

/// Hook for watching a training run.
///
/// Every method defaults to a no-op. Empty clusters are reported here
/// rather than as errors: training continues and leaves those codewords
/// unchanged for the iteration.
pub trait TrainObserver {
    fn on_iteration(&mut self, _stats: &IterationStats) {}

    /// Called with the indices of codewords whose cluster was empty.
    fn on_empty_clusters(&mut self, _level_size: usize, _iteration: usize, _empty: &[usize]) {}

    fn on_level_complete(&mut self, _level: &LevelReport) {}
}

/// Observer used by [`LbgTrainer::train`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TrainObserver for NoopObserver {}

// ─────────────────────────────────────────────
// Trainer
// ─────────────────────────────────────────────

/// Binary-split generalized Lloyd trainer.
#[derive(Debug, Clone)]
pub struct LbgTrainer {
    config: TrainConfig,
}

impl LbgTrainer {
    /// # Errors
    ///
    /// Returns [`VqError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train a codebook of `target_size` codewords.
    ///
    /// An empty store yields an empty codebook.
    pub fn train(&self, store: &VectorStore) -> Result<Codebook> {
        let report = self.train_with(store, &mut NoopObserver, &CancelToken::new())?;
        Ok(report.codebook)
    }

    /// Train with an observer and a cancellation flag.
    pub fn train_with<O: TrainObserver>(
        &self,
        store:    &VectorStore,
        observer: &mut O,
        cancel:   &CancelToken,
    ) -> Result<TrainReport> {
        let dim = store.dimension();
        let target = self.config.target_size;

        info!(vectors = store.len(), dim, target_size = target, "LBG training started");

        let Some(centroid) = store.centroid() else {
            info!("empty training set, returning empty codebook");
            return Ok(TrainReport {
                codebook: Codebook::with_capacity(dim, 0),
                levels: Vec::new(),
                assignments: Vec::new(),
                final_distortion: 0.0,
                cancelled: false,
            });
        };

        if store.len() < target {
            warn!(
                vectors = store.len(),
                target_size = target,
                "fewer training vectors than codewords, some clusters will stay empty"
            );
        }

        // ── Level 1: global centroid ────────────────────────────
        let mut completed = Codebook::with_capacity(dim, target);
        completed.append(centroid)?;

        let initial = assign(store, &completed)?;
        let first_level = LevelReport {
            size: 1,
            iterations: 0,
            distortion: initial.distortion,
            converged: true,
            empty_clusters: 0,
        };
        observer.on_level_complete(&first_level);
        let mut levels = vec![first_level];

        // ── Split + refine until the target size ────────────────
        let e = self.config.perturbation_vector(dim);
        let mut cancelled = false;

        while completed.size() < target {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let mut candidate = split(&completed, &e, target)?;
            match self.refine(store, &mut candidate, observer, cancel)? {
                Some(level) => {
                    levels.push(level);
                    completed = candidate;
                }
                None => {
                    cancelled = true;
                    break;
                }
            }
        }

        if cancelled {
            warn!(size = completed.size(), target_size = target, "LBG training cancelled");
        }

        let codebook = completed.seal();
        let last = assign(store, &codebook)?;

        info!(
            size = codebook.size(),
            levels = levels.len(),
            distortion = last.distortion,
            "LBG training finished"
        );

        Ok(TrainReport {
            codebook,
            levels,
            assignments: last.labels,
            final_distortion: last.distortion,
            cancelled,
        })
    }

    /// Lloyd iterations on a freshly split codebook.
    ///
    /// Returns `None` if cancelled before the level finished.
    fn refine<O: TrainObserver>(
        &self,
        store:    &VectorStore,
        codebook: &mut Codebook,
        observer: &mut O,
        cancel:   &CancelToken,
    ) -> Result<Option<LevelReport>> {
        let size = codebook.size();
        let mut prev = f64::INFINITY;
        let mut level = LevelReport {
            size,
            iterations: 0,
            distortion: f64::INFINITY,
            converged: false,
            empty_clusters: 0,
        };

        for iteration in 0..self.config.max_iterations {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let assignment = assign(store, codebook)?;
            let empty = update(store, codebook, &assignment.labels)?;
            if !empty.is_empty() {
                warn!(level_size = size, iteration, empty = empty.len(), "empty clusters");
                observer.on_empty_clusters(size, iteration, &empty);
            }

            let distortion = assignment.distortion;
            let change = relative_change(prev, distortion);
            debug!(level_size = size, iteration, distortion, change = ?change, "lloyd iteration");
            observer.on_iteration(&IterationStats {
                level_size: size,
                iteration,
                distortion,
                relative_change: change,
                empty_clusters: empty.len(),
            });

            level.iterations = iteration + 1;
            level.distortion = distortion;
            level.empty_clusters = empty.len();

            if change.is_some_and(|c| c < self.config.epsilon) {
                level.converged = true;
                break;
            }
            prev = distortion;
        }

        info!(
            size,
            iterations = level.iterations,
            distortion = level.distortion,
            converged = level.converged,
            "split level refined"
        );
        observer.on_level_complete(&level);
        Ok(Some(level))
    }
}

/// Train a codebook with a uniform perturbation vector.
///
/// Shorthand for [`LbgTrainer::new`] followed by [`LbgTrainer::train`].
pub fn train(
    store:          &VectorStore,
    target_size:    usize,
    epsilon:        f64,
    max_iterations: usize,
    perturbation:   f64,
) -> Result<Codebook> {
    LbgTrainer::new(TrainConfig::new(target_size, epsilon, max_iterations, perturbation))?
        .train(store)
}

// ─────────────────────────────────────────────
// Lloyd steps
// ─────────────────────────────────────────────

struct Assignment {
    labels: Vec<usize>,
    distortion: f64,
}

/// Nearest codeword for every training vector, plus the mean distortion.
fn assign(store: &VectorStore, codebook: &Codebook) -> Result<Assignment> {
    let mut labels = Vec::with_capacity(store.len());
    let mut total = 0.0f64;
    for v in store.iter() {
        let (k, d) = nearest(v, codebook.iter()).ok_or(VqError::EmptyCodebook)?;
        labels.push(k);
        total += d;
    }
    let distortion = if labels.is_empty() {
        0.0
    } else {
        total / labels.len() as f64
    };
    Ok(Assignment { labels, distortion })
}

/// Move each codeword to the mean of its cluster.
///
/// Returns the indices of codewords left untouched because their
/// cluster was empty.
fn update(store: &VectorStore, codebook: &mut Codebook, labels: &[usize]) -> Result<Vec<usize>> {
    let dim = codebook.dimension();
    let mut sums = vec![vec![0.0f64; dim]; codebook.size()];
    let mut counts = vec![0usize; codebook.size()];

    for (v, &k) in store.iter().zip(labels) {
        counts[k] += 1;
        for (s, x) in sums[k].iter_mut().zip(v) {
            *s += *x;
        }
    }

    let mut empty = Vec::new();
    for (k, (mut sum, count)) in sums.into_iter().zip(counts).enumerate() {
        if count == 0 {
            empty.push(k);
            continue;
        }
        let n = count as f64;
        sum.iter_mut().for_each(|s| *s /= n);
        codebook.replace(k, sum)?;
    }
    Ok(empty)
}

/// Split every codeword into `c + e` and `c − e`, in codeword order,
/// stopping once `target` codewords exist.
fn split(codebook: &Codebook, e: &[f64], target: usize) -> Result<Codebook> {
    let mut next = Codebook::with_capacity(codebook.dimension(), target);
    'codewords: for c in codebook.iter() {
        for sign in [1.0, -1.0] {
            if next.size() == target {
                break 'codewords;
            }
            next.append(c.iter().zip(e).map(|(x, p)| x + sign * p).collect())?;
        }
    }
    Ok(next)
}

/// Relative distortion change against the previous iteration.
///
/// `None` when there is no previous iteration in this level. A previous
/// distortion of exactly zero counts as converged.
fn relative_change(prev: f64, current: f64) -> Option<f64> {
    if prev.is_infinite() {
        None
    } else if prev == 0.0 {
        Some(0.0)
    } else {
        Some((prev - current).abs() / prev)
    }
}
