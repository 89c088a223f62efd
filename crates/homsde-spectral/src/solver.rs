use crate::assembler::GalerkinAssembler;
use crate::basis::SpectralBasis;
use crate::config::SpectralConfig;
use crate::context::CellContext;
use crate::projector::FunctionProjector;
use homsde_core::{Estimator, HomError, InvariantMeasure, MeasureStatistics, Problem, Result, SdeCoeffs, State};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::{debug, warn};

/// Eigenvalues of the symmetrized pre-diffusion matrix below this are
/// treated as a failure of positive semi-definiteness.
pub const INDEFINITE_TOLERANCE: f64 = -1e-14;

/// Singular values below this fraction of the largest one are dropped in
/// the cell solve. The ground state √ρ spans the null space of the
/// conjugated generator.
pub const SINGULAR_CUTOFF: f64 = 1e-12;

/// Hermite-Galerkin estimator of the homogenized coefficients.
pub struct SpectralSolver<P, M> {
    problem: P,
    measure: M,
    config: SpectralConfig,
    scaling: Vec<f64>,
    basis: SpectralBasis,
}

impl<P, M> SpectralSolver<P, M>
where
    P: Problem,
    M: InvariantMeasure,
{
    pub fn new(problem: P, measure: M, config: SpectralConfig) -> Result<Self> {
        let nf = problem.fast_dim();
        config.validate(nf)?;

        let basis = SpectralBasis::new(config.degree, nf, config.n_nodes)?;
        debug!(
            degree = config.degree,
            n_fast = nf,
            n_slow = problem.slow_dim(),
            basis = basis.len(),
            nodes = basis.quadrature().len(),
            "built spectral solver"
        );

        Ok(Self {
            scaling: config.scaling_for(nf),
            problem,
            measure,
            config,
            basis,
        })
    }

    /// Solver with [`SpectralConfig::sensible_for`] the problem.
    pub fn with_defaults(problem: P, measure: M) -> Result<Self> {
        let config = SpectralConfig::sensible_for(&problem);
        Self::new(problem, measure, config)
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    pub fn basis(&self) -> &SpectralBasis {
        &self.basis
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    /// Refresh the invariant-measure statistics at x and build the
    /// per-call reference Gaussian. Nothing is carried over between calls.
    fn refresh(&self, x: &State) -> Result<(MeasureStatistics, CellContext)> {
        let stats = self.measure.statistics(x)?;
        if stats.dim() != self.basis.n_dims() {
            return Err(HomError::DimensionMismatch {
                what: "invariant measure",
                expected: self.basis.n_dims(),
                found: stats.dim(),
            });
        }
        let ctx = CellContext::new(&stats, &self.scaling, self.problem.noise_intensity())?;
        Ok((stats, ctx))
    }

    /// Homogenized coefficients at x for each truncation degree in
    /// `degrees`, all from one Galerkin matrix of the configured degree.
    pub fn estimate_degrees(&self, x: &State, degrees: &[usize]) -> Result<Vec<SdeCoeffs>> {
        let ns = self.problem.slow_dim();
        if x.dim() != ns {
            return Err(HomError::DimensionMismatch {
                what: "slow state",
                expected: ns,
                found: x.dim(),
            });
        }
        if let Some(&degree) = degrees.iter().find(|&&d| d > self.config.degree) {
            return Err(HomError::DegreeTooHigh {
                degree,
                max: self.config.degree,
            });
        }

        let (stats, ctx) = self.refresh(x)?;
        let projector = FunctionProjector::new(&self.basis, &ctx)?;

        // Columns: a_i, then ∂a_i/∂x_j at ns + i·ns + j, then ∇*h.
        let n_functions = ns + ns * ns + 1;
        let values = projector.discretize(
            n_functions,
            |y| self.measure.density(x, y, &stats),
            |y| {
                let drift = self.problem.drift(x, y);
                if drift.len() != ns {
                    return Err(HomError::DimensionMismatch {
                        what: "slow drift",
                        expected: ns,
                        found: drift.len(),
                    });
                }
                let dx = self.problem.drift_dx(x, y);
                if dx.shape() != (ns, ns) {
                    return Err(HomError::DimensionMismatch {
                        what: "slow drift derivative",
                        expected: ns,
                        found: if dx.nrows() != ns { dx.nrows() } else { dx.ncols() },
                    });
                }

                let mut out = DVector::zeros(n_functions);
                out.rows_mut(0, ns).copy_from(&drift);
                for i in 0..ns {
                    for j in 0..ns {
                        out[ns + i * ns + j] = dx[(i, j)];
                    }
                }
                out[ns + ns * ns] = self.problem.stardiv_h(x, y);
                Ok(out)
            },
        )?;
        let functions = projector.project_hermite(&values, true)?;
        let matrix = GalerkinAssembler::new(&projector).compute_matrix(&self.problem, x)?;

        debug!(
            x = ?x.as_slice(),
            basis = matrix.nrows(),
            functions = n_functions,
            "assembled cell problem"
        );

        degrees
            .iter()
            .map(|&degree| {
                let n = self.basis.size(degree);
                let sub_matrix = matrix.view((0, 0), (n, n)).into_owned();
                let sub_functions = functions.rows(0, n).into_owned();
                let solutions = solve_cell_problem(&sub_matrix, &sub_functions)?;
                Ok(compute_averages(ns, &sub_functions, &solutions))
            })
            .collect()
    }
}

impl<P, M> Estimator for SpectralSolver<P, M>
where
    P: Problem,
    M: InvariantMeasure,
{
    fn estimate(&self, x: &State) -> Result<SdeCoeffs> {
        let mut result = self.estimate_degrees(x, &[self.config.degree])?;
        result
            .pop()
            .ok_or_else(|| HomError::InvalidConfig("no degree evaluated".to_string()))
    }
}

/// Least-squares solve of M X = B through the SVD, dropping directions
/// whose singular value falls below [`SINGULAR_CUTOFF`] relative to the
/// largest.
pub fn solve_cell_problem(matrix: &DMatrix<f64>, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if matrix.nrows() != rhs.nrows() {
        return Err(HomError::DimensionMismatch {
            what: "right-hand side",
            expected: matrix.nrows(),
            found: rhs.nrows(),
        });
    }

    let svd = matrix.clone().svd(true, true);
    let largest = svd.singular_values.max();
    let eps = SINGULAR_CUTOFF * largest;
    let rank = svd.rank(eps);
    if rank < matrix.nrows() {
        debug!(rank, size = matrix.nrows(), "dropping null directions of the Galerkin matrix");
    }
    svd.solve(rhs, eps).map_err(HomError::Solve)
}

/// Drift and diffusion from the Hermite coefficients of the right-hand
/// sides (`functions`) and of the cell solutions, both laid out one column
/// per function as in [`SpectralSolver::estimate_degrees`].
pub fn compute_averages(ns: usize, functions: &DMatrix<f64>, solutions: &DMatrix<f64>) -> SdeCoeffs {
    let coeffs = |i: usize| functions.column(i);
    let sol = |i: usize| solutions.column(i);
    let coeffs_h = functions.column(ns + ns * ns);

    let mut drift = DVector::zeros(ns);
    let mut a0 = DMatrix::zeros(ns, ns);
    for j in 0..ns {
        // ∂_x part, then the fast-divergence part
        let mut f1 = 0.0;
        for k in 0..ns {
            f1 += sol(ns + j * ns + k).dot(&coeffs(k));
        }
        let f2 = sol(j).dot(&coeffs_h);
        drift[j] = f1 + f2;

        for k in 0..ns {
            a0[(j, k)] = 2.0 * sol(j).dot(&coeffs(k));
        }
    }

    let mut a0 = 0.5 * (&a0 + a0.transpose());
    let eig = SymmetricEigen::new(a0.clone());
    let smallest = eig.eigenvalues.min();
    if smallest < INDEFINITE_TOLERANCE {
        warn!(smallest, "effective diffusion is not positive semi-definite, using zero");
        a0 = DMatrix::zeros(ns, ns);
    }

    SdeCoeffs {
        drift,
        diffusion: symmetric_sqrt(&a0),
    }
}

/// Symmetric positive square root; negative eigenvalues are clamped to zero.
pub fn symmetric_sqrt(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = SymmetricEigen::new(matrix.clone());
    let roots = eig.eigenvalues.map(|l| l.max(0.0).sqrt());
    let scaled = &eig.eigenvectors * DMatrix::from_diagonal(&roots);
    let root = scaled * eig.eigenvectors.transpose();
    0.5 * (&root + root.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// One slow and one fast dimension whose callables return `drift_len`
    /// drift components and a `dx_shape` Jacobian.
    struct MisSized {
        drift_len: usize,
        dx_shape: (usize, usize),
    }

    impl homsde_core::SlowCoupling for MisSized {
        fn slow_dim(&self) -> usize {
            1
        }

        fn drift(&self, _x: &State, y: &DVector<f64>) -> DVector<f64> {
            DVector::from_element(self.drift_len, y[0])
        }

        fn drift_dx(&self, _x: &State, _y: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::zeros(self.dx_shape.0, self.dx_shape.1)
        }
    }

    impl homsde_core::FastGenerator for MisSized {
        fn fast_dim(&self) -> usize {
            1
        }

        fn noise_intensity(&self) -> f64 {
            1.0
        }

        fn linear_term(&self, _x: &State, y: &DVector<f64>) -> f64 {
            0.5 - 0.5 * y[0] * y[0]
        }
    }

    fn mis_sized_estimate(drift_len: usize, dx_shape: (usize, usize)) -> Result<SdeCoeffs> {
        let measure = homsde_core::GaussianMeasure::diagonal(vec![0.5])?;
        let problem = MisSized { drift_len, dx_shape };
        let solver = SpectralSolver::new(problem, measure, SpectralConfig::new(3, 8, 1))?;
        solver.estimate(&State::new(vec![0.1]))
    }

    #[test]
    fn test_mis_sized_drift_is_an_error() {
        assert!(mis_sized_estimate(1, (1, 1)).is_ok());
        assert!(matches!(
            mis_sized_estimate(2, (1, 1)),
            Err(HomError::DimensionMismatch { what: "slow drift", expected: 1, found: 2 })
        ));
        assert!(matches!(
            mis_sized_estimate(1, (1, 3)),
            Err(HomError::DimensionMismatch { what: "slow drift derivative", expected: 1, found: 3 })
        ));
        assert!(matches!(
            mis_sized_estimate(1, (0, 1)),
            Err(HomError::DimensionMismatch { what: "slow drift derivative", expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_symmetric_sqrt() {
        let m = DMatrix::from_row_slice(2, 2, &[5.0, 2.0, 2.0, 2.0]);
        let root = symmetric_sqrt(&m);
        let back = &root * &root;
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(back[(i, j)], m[(i, j)], epsilon = 1e-12);
            }
        }
        assert_eq!(root[(0, 1)], root[(1, 0)]);
    }

    #[test]
    fn test_solve_drops_null_direction() {
        let m = DMatrix::from_diagonal(&DVector::from_vec(vec![0.0, 2.0, 4.0]));
        let b = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 1.0]);
        let x = solve_cell_problem(&m, &b).unwrap();
        assert_relative_eq!(x[(0, 0)], 0.0);
        assert_relative_eq!(x[(1, 0)], 0.5, epsilon = 1e-14);
        assert_relative_eq!(x[(2, 0)], 0.25, epsilon = 1e-14);
    }

    #[test]
    fn test_solve_rejects_mismatched_rhs() {
        let m = DMatrix::<f64>::identity(3, 3);
        let b = DMatrix::zeros(2, 1);
        assert!(matches!(
            solve_cell_problem(&m, &b),
            Err(HomError::DimensionMismatch { what: "right-hand side", .. })
        ));
    }

    #[test]
    fn test_averages_one_slow_dim() {
        // ns = 1: columns a, ∂a/∂x, ∇*h
        let functions = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 1.0, 2.0, 0.5, 3.0, -1.0, 1.0]);
        let solutions = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 0.5, 1.0, 0.0, 1.0, -0.5, 0.0]);
        let c = compute_averages(1, &functions, &solutions);

        // F1 = <sol_dx, a> = 1·1 + (-0.5)·3, F2 = <sol, h> = 0.5·0.5 + 1·1
        assert_relative_eq!(c.drift[0], -0.5 + 1.25, epsilon = 1e-15);
        // A0 = 2 <sol, a> = 2 (0.5 + 3)
        assert_relative_eq!(c.diffusion[(0, 0)], 7f64.sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn test_indefinite_diffusion_is_zeroed() {
        let functions = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let solutions = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
        let c = compute_averages(1, &functions, &solutions);
        assert_eq!(c.diffusion[(0, 0)], 0.0);
    }
}
