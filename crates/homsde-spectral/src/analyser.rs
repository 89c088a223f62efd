use crate::quadrature::QuadratureRule;
use homsde_core::{FastPotential, HomError, InvariantMeasure, MeasureStatistics, Result, State};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Invariant measure ρ ∝ exp(-V(x, ·)) of a gradient fast process.
///
/// Normalizer, mean and covariance are integrated on a tensor Gauss-Hermite
/// grid placed at `centre` with per-dimension spread `spread`, which should
/// cover the bulk of ρ for every slow state of interest.
pub struct PotentialMeasure<P> {
    potential: P,
    centre: DVector<f64>,
    spread: DVector<f64>,
    rule: QuadratureRule,
}

impl<P: FastPotential> PotentialMeasure<P> {
    pub fn new(potential: P, centre: DVector<f64>, spread: DVector<f64>, n_nodes: usize) -> Result<Self> {
        let n = centre.len();
        if spread.len() != n {
            return Err(HomError::DimensionMismatch {
                what: "quadrature spread",
                expected: n,
                found: spread.len(),
            });
        }
        if let Some(&bad) = spread.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(HomError::InvalidConfig(format!(
                "quadrature spread must be positive, got {}",
                bad
            )));
        }

        Ok(Self {
            potential,
            rule: QuadratureRule::gauss_hermite(n_nodes, n)?,
            centre,
            spread,
        })
    }

    pub fn potential(&self) -> &P {
        &self.potential
    }

    fn to_real(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.centre + self.spread.component_mul(z)
    }
}

impl<P: FastPotential> InvariantMeasure for PotentialMeasure<P> {
    fn statistics(&self, x: &State) -> Result<MeasureStatistics> {
        let n = self.centre.len();
        let points: Vec<DVector<f64>> = self.rule.nodes().iter().map(|z| self.to_real(z)).collect();

        // log of w_j exp(-V(y_j)) / φ(z_j), up to the constant (n/2) log 2π
        let log_terms: Vec<f64> = self
            .rule
            .nodes()
            .iter()
            .zip(self.rule.weights())
            .zip(&points)
            .map(|((z, w), y)| w.ln() + 0.5 * z.norm_squared() - self.potential.potential(x, y))
            .collect();

        let peak = log_terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !peak.is_finite() {
            return Err(HomError::InvalidConfig(
                "invariant density vanishes on the quadrature grid".to_string(),
            ));
        }
        let scaled: Vec<f64> = log_terms.iter().map(|l| (l - peak).exp()).collect();
        let total: f64 = scaled.iter().sum();

        let mut mean = DVector::zeros(n);
        for (p, y) in scaled.iter().zip(&points) {
            mean += y * (p / total);
        }
        let mut covariance = DMatrix::zeros(n, n);
        for (p, y) in scaled.iter().zip(&points) {
            let centred = y - &mean;
            covariance.ger(p / total, &centred, &centred, 1.0);
        }

        let mut stats = MeasureStatistics::from_covariance(mean, covariance)?;
        stats.log_normalizer = peak
            + total.ln()
            + self.spread.iter().map(|s| s.ln()).sum::<f64>()
            + 0.5 * n as f64 * (2.0 * PI).ln();
        Ok(stats)
    }

    fn density(&self, x: &State, y: &DVector<f64>, stats: &MeasureStatistics) -> f64 {
        (-self.potential.potential(x, y) - stats.log_normalizer).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// V = (y - x)² / (2σ²) + c: a shifted Gaussian with an arbitrary offset.
    struct Shifted {
        sigma: f64,
    }

    impl FastPotential for Shifted {
        fn potential(&self, x: &State, y: &DVector<f64>) -> f64 {
            let d = y[0] - x[0];
            d * d / (2.0 * self.sigma * self.sigma) + 3.0
        }
    }

    #[test]
    fn test_recovers_gaussian_statistics() {
        let measure = PotentialMeasure::new(
            Shifted { sigma: 0.8 },
            DVector::zeros(1),
            DVector::from_element(1, 1.0),
            40,
        )
        .unwrap();
        let x = State::new(vec![0.3]);
        let stats = measure.statistics(&x).unwrap();

        assert_relative_eq!(stats.bias[0], 0.3, epsilon = 1e-10);
        assert_relative_eq!(stats.covariance()[(0, 0)], 0.64, epsilon = 1e-10);

        // ∫ exp(-V) = sqrt(2π) σ e^{-3}
        let expected = (2.0 * PI).sqrt().ln() + 0.8f64.ln() - 3.0;
        assert_relative_eq!(stats.log_normalizer, expected, epsilon = 1e-10);

        let y = DVector::from_element(1, 0.3);
        let peak = measure.density(&x, &y, &stats);
        assert_relative_eq!(peak, 1.0 / ((2.0 * PI).sqrt() * 0.8), max_relative = 1e-10);
    }

    #[test]
    fn test_rejects_bad_spread() {
        let err = PotentialMeasure::new(
            Shifted { sigma: 1.0 },
            DVector::zeros(1),
            DVector::from_element(1, 0.0),
            10,
        );
        assert!(matches!(err, Err(HomError::InvalidConfig(_))));
    }
}
