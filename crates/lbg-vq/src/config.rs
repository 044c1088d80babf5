use serde::{Deserialize, Serialize};

use crate::{Result, VqError};

/// Parameters of one LBG training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Requested number of codewords. Must be at least 1.
    pub target_size: usize,
    /// Relative distortion change below which a refine phase stops early.
    pub epsilon: f64,
    /// Maximum Lloyd iterations per split level.
    pub max_iterations: usize,
    /// Per-coordinate magnitude of the split perturbation vector.
    pub perturbation: f64,
    /// Extra amount added to coordinate 0 of the perturbation vector.
    ///
    /// Zero keeps the perturbation uniform across coordinates.
    #[serde(default)]
    pub symmetry_offset: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            target_size:     128,
            epsilon:         1e-5,
            max_iterations:  100,
            perturbation:    1.0,
            symmetry_offset: 0.0,
        }
    }
}

impl TrainConfig {
    /// Config with the given split/refine parameters and no symmetry offset.
    pub fn new(target_size: usize, epsilon: f64, max_iterations: usize, perturbation: f64) -> Self {
        Self {
            target_size,
            epsilon,
            max_iterations,
            perturbation,
            symmetry_offset: 0.0,
        }
    }

    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("LBG_TARGET_SIZE") {
            if let Ok(n) = v.parse() { cfg.target_size = n; }
        }
        if let Ok(v) = std::env::var("LBG_EPSILON") {
            if let Ok(f) = v.parse() { cfg.epsilon = f; }
        }
        if let Ok(v) = std::env::var("LBG_MAX_ITERATIONS") {
            if let Ok(n) = v.parse() { cfg.max_iterations = n; }
        }
        if let Ok(v) = std::env::var("LBG_PERTURBATION") {
            if let Ok(f) = v.parse() { cfg.perturbation = f; }
        }
        if let Ok(v) = std::env::var("LBG_SYMMETRY_OFFSET") {
            if let Ok(f) = v.parse() { cfg.symmetry_offset = f; }
        }
        cfg
    }

    /// Check the training preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`VqError::InvalidConfig`] naming the first violated bound.
    pub fn validate(&self) -> Result<()> {
        if self.target_size == 0 {
            return Err(VqError::InvalidConfig("target_size must be at least 1".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(VqError::InvalidConfig(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(VqError::InvalidConfig("max_iterations must be at least 1".into()));
        }
        if !(self.perturbation.is_finite() && self.perturbation > 0.0) {
            return Err(VqError::InvalidConfig(format!(
                "perturbation must be finite and > 0, got {}",
                self.perturbation
            )));
        }
        if !self.symmetry_offset.is_finite() {
            return Err(VqError::InvalidConfig(format!(
                "symmetry_offset must be finite, got {}",
                self.symmetry_offset
            )));
        }
        if self.perturbation + self.symmetry_offset <= 0.0 {
            return Err(VqError::InvalidConfig(format!(
                "perturbation + symmetry_offset must be > 0, got {}",
                self.perturbation + self.symmetry_offset
            )));
        }
        Ok(())
    }

    /// The split perturbation vector `e` for dimension `dim`.
    pub(crate) fn perturbation_vector(&self, dim: usize) -> Vec<f64> {
        let mut e = vec![self.perturbation; dim];
        if let Some(first) = e.first_mut() {
            *first += self.symmetry_offset;
        }
        e
    }
}
