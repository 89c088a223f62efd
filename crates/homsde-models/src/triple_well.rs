use homsde_core::{FastGenerator, FastPotential, SlowCoupling, State};
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use std::f64::consts::PI;

/// ρ has three separated modes; a reference Gaussian at 0.35 of its
/// covariance spread resolves them at moderate degree.
pub const REFERENCE_SCALING: f64 = 0.35;

/// Manufactured two-slow/two-fast problem in the triple-well potential
///
///   V(y) = Πⱼ |y - pⱼ|²,  pⱼ = (cos θⱼ, sin θⱼ),  θⱼ ∈ {0, 2π/3, 4π/3},
///
/// with s = √2, so L = Δ - ∇V·∇. The slow drift is a = -L g for
///   g = (cos(x₀ + y₀ + y₁), sin(x₁) sin(y₀ + y₁)),
/// and the fast drift at order 1/ε is
///   h = (cos x₀ cos y₀ cos y₁, cos x₀ cos(y₀ + y₁)).
///
/// ρ is not Gaussian; pair it with a quadrature-based measure.
#[derive(Clone, Debug)]
pub struct TripleWell {
    pub wells: [Vector2<f64>; 3],
}

impl Default for TripleWell {
    fn default() -> Self {
        Self::new()
    }
}

impl TripleWell {
    pub fn new() -> Self {
        let well = |k: f64| {
            let theta = 2.0 * PI * k / 3.0;
            Vector2::new(theta.cos(), theta.sin())
        };
        Self {
            wells: [well(0.0), well(1.0), well(2.0)],
        }
    }

    fn factors(&self, y: &DVector<f64>) -> [(f64, Vector2<f64>); 3] {
        let point = Vector2::new(y[0], y[1]);
        self.wells.map(|p| {
            let d = point - p;
            (d.norm_squared(), 2.0 * d)
        })
    }

    /// V(y)
    pub fn value(&self, y: &DVector<f64>) -> f64 {
        self.factors(y).iter().map(|(p, _)| p).product()
    }

    /// ∇V(y)
    pub fn gradient(&self, y: &DVector<f64>) -> Vector2<f64> {
        let f = self.factors(y);
        let mut grad = Vector2::zeros();
        for j in 0..3 {
            let others: f64 = (0..3).filter(|&k| k != j).map(|k| f[k].0).product();
            grad += f[j].1 * others;
        }
        grad
    }

    /// ΔV(y)
    pub fn laplacian(&self, y: &DVector<f64>) -> f64 {
        let f = self.factors(y);
        let mut lap = 0.0;
        for j in 0..3 {
            let others: f64 = (0..3).filter(|&k| k != j).map(|k| f[k].0).product();
            lap += 4.0 * others;
            for k in j + 1..3 {
                let remaining = f[3 - j - k].0;
                lap += 2.0 * f[j].1.dot(&f[k].1) * remaining;
            }
        }
        lap
    }

    /// g(x, y)
    pub fn cell_solution(&self, x: &State, y: &DVector<f64>) -> Vector2<f64> {
        let sigma = y[0] + y[1];
        Vector2::new((x[0] + sigma).cos(), x[1].sin() * sigma.sin())
    }

    /// ∂gᵢ/∂xⱼ
    pub fn cell_solution_dx(&self, x: &State, y: &DVector<f64>) -> Matrix2<f64> {
        let sigma = y[0] + y[1];
        Matrix2::new(-(x[0] + sigma).sin(), 0.0, 0.0, x[1].cos() * sigma.sin())
    }

    /// h(x, y)
    pub fn fast_drift(&self, x: &State, y: &DVector<f64>) -> Vector2<f64> {
        let c = x[0].cos();
        Vector2::new(c * y[0].cos() * y[1].cos(), c * (y[0] + y[1]).cos())
    }
}

impl SlowCoupling for TripleWell {
    fn slow_dim(&self) -> usize {
        2
    }

    fn drift(&self, x: &State, y: &DVector<f64>) -> DVector<f64> {
        let grad = self.gradient(y);
        let g = grad[0] + grad[1];
        let sigma = y[0] + y[1];
        let (st, ct) = (x[0] + sigma).sin_cos();
        let (ss, cs) = sigma.sin_cos();
        let s1 = x[1].sin();
        DVector::from_vec(vec![2.0 * ct - g * st, 2.0 * s1 * ss + g * s1 * cs])
    }

    fn drift_dx(&self, x: &State, y: &DVector<f64>) -> DMatrix<f64> {
        let grad = self.gradient(y);
        let g = grad[0] + grad[1];
        let sigma = y[0] + y[1];
        let (st, ct) = (x[0] + sigma).sin_cos();
        let (ss, cs) = sigma.sin_cos();
        let c1 = x[1].cos();
        DMatrix::from_row_slice(2, 2, &[-2.0 * st - g * ct, 0.0, 0.0, 2.0 * c1 * ss + g * c1 * cs])
    }
}

impl FastGenerator for TripleWell {
    fn fast_dim(&self) -> usize {
        2
    }

    fn noise_intensity(&self) -> f64 {
        std::f64::consts::SQRT_2
    }

    /// (s²/4) ΔV - (s²/8) |∇V|² with s² = 2
    fn linear_term(&self, _x: &State, y: &DVector<f64>) -> f64 {
        0.5 * self.laplacian(y) - 0.25 * self.gradient(y).norm_squared()
    }

    fn stardiv_h(&self, x: &State, y: &DVector<f64>) -> f64 {
        let grad = self.gradient(y);
        let h = self.fast_drift(x, y);
        let c = x[0].cos();
        let divergence = -c * y[0].sin() * y[1].cos() - c * (y[0] + y[1]).sin();
        grad.dot(&h) - divergence
    }

    fn reference_scaling(&self) -> f64 {
        REFERENCE_SCALING
    }
}

impl FastPotential for TripleWell {
    fn potential(&self, _x: &State, y: &DVector<f64>) -> f64 {
        self.value(y)
    }
}
