use nalgebra::{DMatrix, DVector};
use serde::{Serialize, Deserialize};

/// Point of the slow process at which the homogenized coefficients are
/// evaluated. Problem callables receive it next to the fast point `y`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State(pub DVector<f64>);

impl State {
    pub fn new(values: Vec<f64>) -> Self {
        State(DVector::from_vec(values))
    }

    pub fn zeros(n: usize) -> Self {
        State(DVector::zeros(n))
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

impl std::ops::Deref for State {
    type Target = DVector<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for State {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<DVector<f64>> for State {
    fn from(v: DVector<f64>) -> Self {
        State(v)
    }
}

impl From<Vec<f64>> for State {
    fn from(v: Vec<f64>) -> Self {
        State::new(v)
    }
}

/// Effective coefficients of the homogenized slow equation
/// dX = drift dt + diffusion dW.
///
/// `diffusion` is a square root of the effective diffusion tensor, so a
/// time integrator advances with `x + dt * drift + diffusion * sqrt(dt) * dW`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SdeCoeffs {
    pub drift: DVector<f64>,
    pub diffusion: DMatrix<f64>,
}

impl SdeCoeffs {
    pub fn zeros(ns: usize) -> Self {
        Self {
            drift: DVector::zeros(ns),
            diffusion: DMatrix::zeros(ns, ns),
        }
    }

    pub fn dim(&self) -> usize {
        self.drift.len()
    }

    /// diffusion * diffusionᵀ
    pub fn diffusion_tensor(&self) -> DMatrix<f64> {
        &self.diffusion * self.diffusion.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_deref() {
        let x = State::new(vec![0.2, -1.0]);
        assert_eq!(x.dim(), 2);
        assert_eq!(x[1], -1.0);
    }

    #[test]
    fn test_diffusion_tensor_is_square_of_factor() {
        let coeffs = SdeCoeffs {
            drift: DVector::zeros(2),
            diffusion: DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 2.0, 3.0]),
        };
        let tensor = coeffs.diffusion_tensor();
        assert_eq!(tensor, DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 13.0]));
    }

    #[test]
    fn test_coeffs_serialize() {
        let coeffs = SdeCoeffs::zeros(1);
        let json = serde_json::to_string(&coeffs).unwrap();
        let back: SdeCoeffs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coeffs);
    }
}
