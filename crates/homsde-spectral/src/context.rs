use homsde_core::{HomError, MeasureStatistics, Result};
use nalgebra::{DMatrix, DVector};

/// Per-call view of the reference Gaussian: the refreshed statistics of the
/// invariant measure with the configured stretch applied.
#[derive(Clone, Debug)]
pub struct CellContext {
    pub bias: DVector<f64>,
    /// Scaled covariance eigenvalues.
    pub eig_val: DVector<f64>,
    /// Columns are eigenvectors scaled by sqrt of their eigenvalue.
    pub sqrt_cov: DMatrix<f64>,
    pub det_cov: f64,
    /// Squared noise intensity s².
    pub noise_sq: f64,
}

impl CellContext {
    pub fn new(stats: &MeasureStatistics, scaling: &[f64], noise_intensity: f64) -> Result<Self> {
        let n = stats.dim();
        if scaling.len() != n {
            return Err(HomError::DimensionMismatch {
                what: "scaling",
                expected: n,
                found: scaling.len(),
            });
        }

        let eig_val = DVector::from_iterator(
            n,
            stats
                .eig_val_cov
                .iter()
                .zip(scaling)
                .map(|(&lambda, &s)| lambda * s * s),
        );
        for (dim, &value) in eig_val.iter().enumerate() {
            if !(value > f64::EPSILON) {
                return Err(HomError::NonPositiveVariance { dim, value });
            }
        }

        let mut sqrt_cov = stats.eig_vec_cov.clone();
        for (j, mut column) in sqrt_cov.column_iter_mut().enumerate() {
            column *= eig_val[j].sqrt();
        }

        Ok(Self {
            bias: stats.bias.clone(),
            det_cov: eig_val.iter().product(),
            eig_val,
            sqrt_cov,
            noise_sq: noise_intensity * noise_intensity,
        })
    }

    pub fn dim(&self) -> usize {
        self.bias.len()
    }

    /// y = sqrt_cov · z + bias.
    pub fn map_to_real(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.sqrt_cov * z + &self.bias
    }

    /// Zero-order term of the conjugated generator when the invariant
    /// measure is exactly the reference Gaussian, in reference coordinates.
    pub fn gaussian_linear_term(&self, z: &DVector<f64>) -> f64 {
        let mut laplacian = 0.0;
        let mut grad2 = 0.0;
        for (zk, lambda) in z.iter().zip(self.eig_val.iter()) {
            laplacian += 1.0 / lambda;
            grad2 += zk * zk / lambda;
        }
        0.25 * self.noise_sq * laplacian - 0.125 * self.noise_sq * grad2
    }

    /// Jacobian factor det(cov)^{1/4} of the change of variables.
    pub fn rescale_factor(&self) -> f64 {
        self.det_cov.sqrt().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rotated_stats() -> MeasureStatistics {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.6, 0.6, 1.0]);
        MeasureStatistics::from_covariance(DVector::from_vec(vec![0.5, -1.0]), cov).unwrap()
    }

    #[test]
    fn test_sqrt_cov_reproduces_covariance() {
        let stats = rotated_stats();
        let ctx = CellContext::new(&stats, &[1.0, 1.0], 1.0).unwrap();
        let cov = &ctx.sqrt_cov * ctx.sqrt_cov.transpose();
        let expected = stats.covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(cov[(i, j)], expected[(i, j)], epsilon = 1e-12);
            }
        }
        assert_relative_eq!(ctx.det_cov, 2.0 - 0.36, max_relative = 1e-12);
    }

    #[test]
    fn test_map_to_real_origin_is_bias() {
        let ctx = CellContext::new(&rotated_stats(), &[1.0, 1.0], 1.0).unwrap();
        let y = ctx.map_to_real(&DVector::zeros(2));
        assert_eq!(y, ctx.bias);
    }

    #[test]
    fn test_scaling_multiplies_variances() {
        let stats = MeasureStatistics::diagonal(DVector::zeros(2), DVector::from_vec(vec![1.0, 4.0])).unwrap();
        let ctx = CellContext::new(&stats, &[2.0, 0.5], 2f64.sqrt()).unwrap();
        assert_relative_eq!(ctx.eig_val[0], 4.0);
        assert_relative_eq!(ctx.eig_val[1], 1.0);
        assert_relative_eq!(ctx.noise_sq, 2.0, max_relative = 1e-15);
        assert_relative_eq!(ctx.rescale_factor(), 2f64.sqrt(), max_relative = 1e-15);
    }

    #[test]
    fn test_gaussian_linear_term_matches_ou() {
        // OU with rate 3 and s = sqrt(2): variance 1/3, linear term 3/2 - 9y²/4
        let stats = MeasureStatistics::diagonal(DVector::zeros(1), DVector::from_vec(vec![1.0 / 3.0])).unwrap();
        let ctx = CellContext::new(&stats, &[1.0], 2f64.sqrt()).unwrap();
        let z = DVector::from_vec(vec![0.8]);
        let y = ctx.map_to_real(&z)[0];
        assert_relative_eq!(ctx.gaussian_linear_term(&z), 1.5 - 2.25 * y * y, max_relative = 1e-12);
    }

    #[test]
    fn test_rejects_collapsed_variance() {
        let stats = MeasureStatistics::diagonal(DVector::zeros(1), DVector::from_vec(vec![1e-10])).unwrap();
        let err = CellContext::new(&stats, &[1e-4], 1.0).unwrap_err();
        assert!(matches!(err, HomError::NonPositiveVariance { dim: 0, .. }));
    }
}
