use crate::hermite::MAX_DEGREE;
use homsde_core::{FastGenerator, HomError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of the spectral solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Maximal total degree of the Hermite basis.
    pub degree: usize,
    /// Gauss-Hermite nodes per fast dimension.
    pub n_nodes: usize,
    /// Per-dimension stretch of the reference Gaussian. Empty means unit scaling.
    #[serde(default)]
    pub scaling: Vec<f64>,
}

impl SpectralConfig {
    pub fn new(degree: usize, n_nodes: usize, n_fast: usize) -> Self {
        Self {
            degree,
            n_nodes,
            scaling: vec![1.0; n_fast],
        }
    }

    /// Degree 10 with enough nodes to project degree-20 products exactly.
    pub fn sensible(n_fast: usize) -> Self {
        let degree = 10;
        Self::new(degree, 2 * degree + 1, n_fast)
    }

    /// [`SpectralConfig::sensible`] with the problem's reference scaling in
    /// every fast dimension.
    pub fn sensible_for<G: FastGenerator + ?Sized>(problem: &G) -> Self {
        let n_fast = problem.fast_dim();
        Self::sensible(n_fast).with_scaling(vec![problem.reference_scaling(); n_fast])
    }

    pub fn with_scaling(mut self, scaling: Vec<f64>) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self, n_fast: usize) -> Result<()> {
        if self.degree > MAX_DEGREE {
            return Err(HomError::DegreeTooHigh {
                degree: self.degree,
                max: MAX_DEGREE,
            });
        }
        if self.n_nodes == 0 {
            return Err(HomError::InvalidConfig("n_nodes must be positive".to_string()));
        }
        if !self.scaling.is_empty() && self.scaling.len() != n_fast {
            return Err(HomError::DimensionMismatch {
                what: "scaling",
                expected: n_fast,
                found: self.scaling.len(),
            });
        }
        if let Some(bad) = self.scaling.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(HomError::InvalidConfig(format!(
                "scaling factors must be positive and finite, got {}",
                bad
            )));
        }
        Ok(())
    }

    /// Scaling factors for `n_fast` dimensions, filling in unit scaling.
    pub fn scaling_for(&self, n_fast: usize) -> Vec<f64> {
        if self.scaling.is_empty() {
            vec![1.0; n_fast]
        } else {
            self.scaling.clone()
        }
    }
}
