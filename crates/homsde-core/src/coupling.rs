use crate::State;
use nalgebra::{DMatrix, DVector};

/// Slow equation of the multiscale system: dX = a(X, Y)/ε dt.
pub trait SlowCoupling: Send + Sync {
    /// Number of slow variables.
    fn slow_dim(&self) -> usize;

    /// a(x, y), one entry per slow variable
    fn drift(&self, x: &State, y: &DVector<f64>) -> DVector<f64>;

    /// ∂aᵢ/∂xⱼ as a slow_dim × slow_dim matrix
    fn drift_dx(&self, x: &State, y: &DVector<f64>) -> DMatrix<f64>;

    /// Optional ∂aᵢ/∂yⱼ (slow_dim × fast_dim)
    fn drift_dy(&self, _x: &State, _y: &DVector<f64>) -> Option<DMatrix<f64>> {
        None
    }
}
