use homsde_core::{
    FastGenerator, FastPotential, GaussianMeasure, HomError, Result, SdeCoeffs, SlowCoupling, State,
};
use nalgebra::{DMatrix, DVector};

/// Slow variable driven by independent fast Ornstein-Uhlenbeck processes:
///
///   dX = cos(X) Σₖ sin(Yₖ) / ε dt
///   dYₖ = -λₖ Yₖ / ε² dt + √2 / ε dWₖ
///
/// The invariant measure is N(0, diag(1/λₖ)) and the cell problem is
/// diagonal in the Hermite basis, so the homogenized coefficients have a
/// closed form (see [`OuSine::exact_coefficients`]).
#[derive(Clone, Debug)]
pub struct OuSine {
    pub rates: Vec<f64>, // λₖ, one per fast dimension
}

impl OuSine {
    pub fn new(rates: Vec<f64>) -> Result<Self> {
        if rates.is_empty() {
            return Err(HomError::InvalidConfig("at least one fast rate is needed".to_string()));
        }
        if let Some(&bad) = rates.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(HomError::InvalidConfig(format!("OU rates must be positive, got {}", bad)));
        }
        Ok(Self { rates })
    }

    /// Rates {1, 2, 4}.
    pub fn standard() -> Self {
        Self {
            rates: vec![1.0, 2.0, 4.0],
        }
    }

    /// Stationary variances 1/λₖ
    pub fn stationary_variances(&self) -> Vec<f64> {
        self.rates.iter().map(|l| 1.0 / l).collect()
    }

    pub fn invariant_measure(&self) -> Result<GaussianMeasure> {
        GaussianMeasure::diagonal(self.stationary_variances())
    }

    /// 2 E[ψ sin(y)] where -Lψ = sin(y) for one OU component of rate λ.
    ///
    /// With α² = 1/λ, sin(y) = Σ_{n odd} (-1)^{(n-1)/2} e^{-α²/2} αⁿ/√n! hₙ
    /// and hₙ is an eigenfunction of -L with eigenvalue nλ.
    pub fn component_variance(rate: f64) -> f64 {
        let alpha2 = 1.0 / rate;
        let mut sum = 0.0;
        let mut power_over_factorial = alpha2; // α^{2n}/n! at n = 1
        let mut n = 1;
        while n < 200 {
            let term = power_over_factorial / n as f64;
            sum += term;
            if term < 1e-18 * sum {
                break;
            }
            power_over_factorial *= alpha2 * alpha2 / ((n + 1) * (n + 2)) as f64;
            n += 2;
        }
        2.0 * (-alpha2).exp() * sum / rate
    }

    /// Closed-form homogenized coefficients at x.
    /// A = cos²(x) Σₖ K(λₖ), drift = -sin(x) cos(x) Σₖ K(λₖ) / 2.
    pub fn exact_coefficients(&self, x: &State) -> SdeCoeffs {
        let total: f64 = self.rates.iter().map(|&l| Self::component_variance(l)).sum();
        let (s, c) = x[0].sin_cos();
        SdeCoeffs {
            drift: DVector::from_element(1, -s * c * total / 2.0),
            diffusion: DMatrix::from_element(1, 1, c.abs() * total.sqrt()),
        }
    }
}

impl SlowCoupling for OuSine {
    fn slow_dim(&self) -> usize {
        1
    }

    fn drift(&self, x: &State, y: &DVector<f64>) -> DVector<f64> {
        let sines: f64 = y.iter().map(|yk| yk.sin()).sum();
        DVector::from_element(1, x[0].cos() * sines)
    }

    fn drift_dx(&self, x: &State, y: &DVector<f64>) -> DMatrix<f64> {
        let sines: f64 = y.iter().map(|yk| yk.sin()).sum();
        DMatrix::from_element(1, 1, -x[0].sin() * sines)
    }

    fn drift_dy(&self, x: &State, y: &DVector<f64>) -> Option<DMatrix<f64>> {
        let c = x[0].cos();
        Some(DMatrix::from_fn(1, y.len(), |_, k| c * y[k].cos()))
    }
}

impl FastGenerator for OuSine {
    fn fast_dim(&self) -> usize {
        self.rates.len()
    }

    fn noise_intensity(&self) -> f64 {
        std::f64::consts::SQRT_2
    }

    fn linear_term(&self, _x: &State, y: &DVector<f64>) -> f64 {
        self.rates
            .iter()
            .zip(y.iter())
            .map(|(l, yk)| 0.5 * l - 0.25 * l * l * yk * yk)
            .sum()
    }
}

impl FastPotential for OuSine {
    fn potential(&self, _x: &State, y: &DVector<f64>) -> f64 {
        self.rates.iter().zip(y.iter()).map(|(l, yk)| 0.5 * l * yk * yk).sum()
    }
}
