use crate::State;
use crate::coupling::SlowCoupling;
use nalgebra::DVector;

/// Fast process dY = -(s²/2)∇V/ε² dt + h/ε dt + s/ε dW, described through
/// the pieces the cell problem needs.
pub trait FastGenerator: Send + Sync {
    /// Number of fast variables.
    fn fast_dim(&self) -> usize;

    /// Noise intensity s.
    fn noise_intensity(&self) -> f64;

    /// Zero-order term of the generator conjugated by √ρ:
    /// (s²/4) ΔV - (s²/8) |∇V|².
    fn linear_term(&self, x: &State, y: &DVector<f64>) -> f64;

    /// ∇*h = ∇V·h - ∇·h, the correction from the order-1/ε fast drift.
    fn stardiv_h(&self, _x: &State, _y: &DVector<f64>) -> f64 {
        0.0
    }

    /// Stretch of the reference Gaussian relative to the covariance of ρ
    /// that suits this problem, applied in every fast dimension. Strongly
    /// non-Gaussian densities converge faster with a narrower reference.
    fn reference_scaling(&self) -> f64 {
        1.0
    }
}

/// Potential V of the fast invariant density ρ ∝ exp(-V).
pub trait FastPotential: Send + Sync {
    fn potential(&self, x: &State, y: &DVector<f64>) -> f64;
}

/// A complete fast/slow problem.
pub trait Problem: SlowCoupling + FastGenerator {}

impl<T: SlowCoupling + FastGenerator> Problem for T {}
