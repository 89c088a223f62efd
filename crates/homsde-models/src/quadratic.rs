use homsde_core::{FastGenerator, FastPotential, GaussianMeasure, Result, SlowCoupling, State};
use nalgebra::{DMatrix, DVector};

/// Manufactured one-slow/one-fast problem with potential V(y) = y² and
/// noise intensity s = 1, so L = ½∂²_y - y∂_y and ρ = e^{-y²}/√π.
///
/// The slow drift is built as a = -L g from the prescribed cell solution
///   g(x, y) = sin(xy/2) + x cos(y/2),
/// and the fast drift at order 1/ε is h(x, y) = cos(x) cos(y/2).
#[derive(Clone, Copy, Debug, Default)]
pub struct Quadratic1d;

impl Quadratic1d {
    pub fn new() -> Self {
        Self
    }

    /// ρ = N(0, 1/2)
    pub fn invariant_measure(&self) -> Result<GaussianMeasure> {
        GaussianMeasure::diagonal(vec![0.5])
    }

    /// g(x, y)
    pub fn cell_solution(&self, x: f64, y: f64) -> f64 {
        (x * y / 2.0).sin() + x * (y / 2.0).cos()
    }

    /// ∂g/∂x
    pub fn cell_solution_dx(&self, x: f64, y: f64) -> f64 {
        y / 2.0 * (x * y / 2.0).cos() + (y / 2.0).cos()
    }

    /// h(x, y)
    pub fn fast_drift(&self, x: f64, y: f64) -> f64 {
        x.cos() * (y / 2.0).cos()
    }

    fn a(x: f64, y: f64) -> f64 {
        let (s, c) = (x * y / 2.0).sin_cos();
        let (sh, ch) = (y / 2.0).sin_cos();
        x * x / 8.0 * s + x / 8.0 * ch + x * y / 2.0 * c - x * y / 2.0 * sh
    }
}

impl SlowCoupling for Quadratic1d {
    fn slow_dim(&self) -> usize {
        1
    }

    fn drift(&self, x: &State, y: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, Self::a(x[0], y[0]))
    }

    fn drift_dx(&self, x: &State, y: &DVector<f64>) -> DMatrix<f64> {
        let (x, y) = (x[0], y[0]);
        let (s, c) = (x * y / 2.0).sin_cos();
        let (sh, ch) = (y / 2.0).sin_cos();
        let value = x / 4.0 * s + x * x * y / 16.0 * c + ch / 8.0 + y / 2.0 * c
            - x * y * y / 4.0 * s
            - y / 2.0 * sh;
        DMatrix::from_element(1, 1, value)
    }

    fn drift_dy(&self, x: &State, y: &DVector<f64>) -> Option<DMatrix<f64>> {
        let (x, y) = (x[0], y[0]);
        let (s, c) = (x * y / 2.0).sin_cos();
        let (sh, ch) = (y / 2.0).sin_cos();
        let value = x * x * x / 16.0 * c + x / 2.0 * c - x * x * y / 4.0 * s - 9.0 * x / 16.0 * sh
            - x * y / 4.0 * ch;
        Some(DMatrix::from_element(1, 1, value))
    }
}

impl FastGenerator for Quadratic1d {
    fn fast_dim(&self) -> usize {
        1
    }

    fn noise_intensity(&self) -> f64 {
        1.0
    }

    fn linear_term(&self, _x: &State, y: &DVector<f64>) -> f64 {
        0.5 - 0.5 * y[0] * y[0]
    }

    fn stardiv_h(&self, x: &State, y: &DVector<f64>) -> f64 {
        let (x, y) = (x[0], y[0]);
        let (sh, ch) = (y / 2.0).sin_cos();
        2.0 * y * x.cos() * ch + 0.5 * x.cos() * sh
    }
}

impl FastPotential for Quadratic1d {
    fn potential(&self, _x: &State, y: &DVector<f64>) -> f64 {
        y[0] * y[0]
    }
}
