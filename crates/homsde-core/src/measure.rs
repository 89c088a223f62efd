use crate::{HomError, Result, State};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use std::f64::consts::PI;

/// Snapshot of the statistics of the fast invariant measure at one slow
/// state: mean and eigendecomposition of the covariance.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureStatistics {
    pub bias: DVector<f64>,
    /// Columns are the eigenvectors of the covariance.
    pub eig_vec_cov: DMatrix<f64>,
    pub eig_val_cov: DVector<f64>,
    /// log of the normalization constant of ρ, when the measure needs one.
    pub log_normalizer: f64,
}

impl MeasureStatistics {
    pub fn from_covariance(mean: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        let n = mean.len();
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(HomError::DimensionMismatch {
                what: "covariance",
                expected: n,
                found: covariance.nrows(),
            });
        }

        let symmetric = 0.5 * (&covariance + covariance.transpose());
        let eig = SymmetricEigen::new(symmetric);
        Self::from_eigen(mean, eig.eigenvectors, eig.eigenvalues)
    }

    /// Independent components with the given variances.
    pub fn diagonal(mean: DVector<f64>, variances: DVector<f64>) -> Result<Self> {
        let n = mean.len();
        Self::from_eigen(mean, DMatrix::identity(n, n), variances)
    }

    fn from_eigen(bias: DVector<f64>, eig_vec_cov: DMatrix<f64>, eig_val_cov: DVector<f64>) -> Result<Self> {
        if eig_val_cov.len() != bias.len() {
            return Err(HomError::DimensionMismatch {
                what: "covariance eigenvalues",
                expected: bias.len(),
                found: eig_val_cov.len(),
            });
        }
        for (dim, &value) in eig_val_cov.iter().enumerate() {
            if !(value > f64::EPSILON) {
                return Err(HomError::NonPositiveVariance { dim, value });
            }
        }

        Ok(Self {
            bias,
            eig_vec_cov,
            eig_val_cov,
            log_normalizer: 0.0,
        })
    }

    pub fn dim(&self) -> usize {
        self.bias.len()
    }

    pub fn covariance(&self) -> DMatrix<f64> {
        let scaled = &self.eig_vec_cov * DMatrix::from_diagonal(&self.eig_val_cov);
        scaled * self.eig_vec_cov.transpose()
    }
}

/// Invariant measure of the fast process, frozen at the slow state.
pub trait InvariantMeasure: Send + Sync {
    /// Refresh the statistics at slow state x. Called once per estimator call.
    fn statistics(&self, x: &State) -> Result<MeasureStatistics>;

    /// Normalized density ρ(x, y); `stats` is the snapshot returned by
    /// `statistics(x)` for the same x.
    fn density(&self, x: &State, y: &DVector<f64>, stats: &MeasureStatistics) -> f64;
}

/// Gaussian invariant measure independent of the slow state, as for
/// Ornstein-Uhlenbeck fast dynamics.
#[derive(Clone, Debug)]
pub struct GaussianMeasure {
    stats: MeasureStatistics,
}

impl GaussianMeasure {
    pub fn new(mean: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        Ok(Self {
            stats: MeasureStatistics::from_covariance(mean, covariance)?,
        })
    }

    /// Centred Gaussian with independent components.
    pub fn diagonal(variances: Vec<f64>) -> Result<Self> {
        let n = variances.len();
        Ok(Self {
            stats: MeasureStatistics::diagonal(DVector::zeros(n), DVector::from_vec(variances))?,
        })
    }

    pub fn dim(&self) -> usize {
        self.stats.dim()
    }
}

impl InvariantMeasure for GaussianMeasure {
    fn statistics(&self, _x: &State) -> Result<MeasureStatistics> {
        Ok(self.stats.clone())
    }

    fn density(&self, _x: &State, y: &DVector<f64>, _stats: &MeasureStatistics) -> f64 {
        gaussian_density(&self.stats, y)
    }
}

/// Density of N(bias, covariance) described by `stats`.
pub fn gaussian_density(stats: &MeasureStatistics, y: &DVector<f64>) -> f64 {
    let centred = y - &stats.bias;
    let projected = stats.eig_vec_cov.tr_mul(&centred);

    let mut quadratic = 0.0;
    let mut log_det = 0.0;
    for (p, &lambda) in projected.iter().zip(stats.eig_val_cov.iter()) {
        quadratic += p * p / lambda;
        log_det += lambda.ln();
    }

    let n = stats.dim() as f64;
    (-0.5 * quadratic - 0.5 * log_det - 0.5 * n * (2.0 * PI).ln()).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_covariance_roundtrip() {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let stats = MeasureStatistics::from_covariance(DVector::zeros(2), cov.clone()).unwrap();
        let back = stats.covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(back[(i, j)], cov[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let err = MeasureStatistics::from_covariance(DVector::zeros(2), cov).unwrap_err();
        assert!(matches!(err, HomError::NonPositiveVariance { .. }));
    }

    #[test]
    fn test_gaussian_density_peak() {
        let measure = GaussianMeasure::diagonal(vec![0.5, 2.0]).unwrap();
        let x = State::zeros(1);
        let stats = measure.statistics(&x).unwrap();
        let peak = measure.density(&x, &DVector::zeros(2), &stats);
        // 1 / (2π sqrt(det Σ)) with det Σ = 1
        assert_relative_eq!(peak, 1.0 / (2.0 * PI), max_relative = 1e-14);

        let y = DVector::from_vec(vec![1.0, 0.0]);
        let off = measure.density(&x, &y, &stats);
        assert_relative_eq!(off, peak * (-1.0f64).exp(), max_relative = 1e-14);
    }
}
