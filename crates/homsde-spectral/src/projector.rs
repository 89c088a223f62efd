//! Discretization of functions of the fast variable at the quadrature
//! nodes and their projection onto monomials and Hermite functions.

use crate::basis::SpectralBasis;
use crate::context::CellContext;
use homsde_core::{HomError, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Quadrature nodes handled per rayon task in the projection. Partial sums
/// are added in chunk order, so the result does not depend on the pool size.
const CHUNK_NODES: usize = 256;

pub struct FunctionProjector<'a> {
    basis: &'a SpectralBasis,
    ctx: &'a CellContext,
    /// Quadrature nodes mapped through y = sqrt_cov · z + bias.
    real_points: Vec<DVector<f64>>,
}

impl<'a> FunctionProjector<'a> {
    pub fn new(basis: &'a SpectralBasis, ctx: &'a CellContext) -> Result<Self> {
        if ctx.dim() != basis.n_dims() {
            return Err(HomError::DimensionMismatch {
                what: "reference Gaussian",
                expected: basis.n_dims(),
                found: ctx.dim(),
            });
        }

        let real_points = basis
            .quadrature()
            .nodes()
            .par_iter()
            .map(|z| ctx.map_to_real(z))
            .collect();

        Ok(Self {
            basis,
            ctx,
            real_points,
        })
    }

    pub fn basis(&self) -> &SpectralBasis {
        self.basis
    }

    pub fn context(&self) -> &CellContext {
        self.ctx
    }

    pub fn real_points(&self) -> &[DVector<f64>] {
        &self.real_points
    }

    /// w_j · f(z_j, y_j) at every node.
    pub fn weighted<Func>(&self, f: Func) -> DVector<f64>
    where
        Func: Fn(&DVector<f64>, &DVector<f64>) -> f64 + Sync,
    {
        let rule = self.basis.quadrature();
        let values: Vec<f64> = rule
            .nodes()
            .par_iter()
            .zip(rule.weights().par_iter())
            .zip(self.real_points.par_iter())
            .map(|((z, w), y)| w * f(z, y))
            .collect();
        DVector::from_vec(values)
    }

    /// Row j holds w_j · sqrt(ρ(y_j) / φ(z_j)) · f(y_j) for a vector-valued
    /// f with `n_outputs` components; φ is the standard normal density.
    /// An error returned by `f` at any node aborts the pass.
    pub fn discretize<D, Func>(&self, n_outputs: usize, density: D, f: Func) -> Result<DMatrix<f64>>
    where
        D: Fn(&DVector<f64>) -> f64 + Sync,
        Func: Fn(&DVector<f64>) -> Result<DVector<f64>> + Sync,
    {
        let rule = self.basis.quadrature();
        let quarter_log_2pi = 0.25 * self.basis.n_dims() as f64 * (2.0 * PI).ln();

        let rows: Vec<DVector<f64>> = rule
            .nodes()
            .par_iter()
            .zip(rule.weights().par_iter())
            .zip(self.real_points.par_iter())
            .map(|((z, w), y)| {
                let rho = density(y);
                let ratio = if rho > 0.0 {
                    (0.5 * rho.ln() + 0.25 * z.norm_squared() + quarter_log_2pi).exp()
                } else {
                    0.0
                };
                Ok(f(y)? * (w * ratio))
            })
            .collect::<Result<_>>()?;

        let mut out = DMatrix::zeros(rows.len(), n_outputs);
        for (j, row) in rows.iter().enumerate() {
            if row.len() != n_outputs {
                return Err(HomError::DimensionMismatch {
                    what: "discretized function",
                    expected: n_outputs,
                    found: row.len(),
                });
            }
            out.set_row(j, &row.transpose());
        }
        Ok(out)
    }

    /// Σ_j values[j, ·] · z_j^m for every multi-index m of degree ≤ `degree`,
    /// one column per discretized function. With `rescale` the result is
    /// multiplied by det(cov)^{1/4}.
    pub fn project_monomials(&self, degree: usize, values: &DMatrix<f64>, rescale: bool) -> Result<DMatrix<f64>> {
        let indices = self.basis.indices();
        if degree > indices.degree() {
            return Err(HomError::DegreeTooHigh {
                degree,
                max: indices.degree(),
            });
        }
        let nodes = self.basis.quadrature().nodes();
        if values.nrows() != nodes.len() {
            return Err(HomError::DimensionMismatch {
                what: "discretized values",
                expected: nodes.len(),
                found: values.nrows(),
            });
        }

        let nb = indices.len_up_to(degree);
        let n_out = values.ncols();
        let parents = &indices.parents()[..nb];

        let partials: Vec<DMatrix<f64>> = nodes
            .par_chunks(CHUNK_NODES)
            .enumerate()
            .map(|(chunk, points)| {
                let mut acc = DMatrix::zeros(nb, n_out);
                let mut mono = DVector::from_element(nb, 1.0);
                for (offset, z) in points.iter().enumerate() {
                    for (j, &(parent, dim)) in parents.iter().enumerate().skip(1) {
                        mono[j] = mono[parent] * z[dim];
                    }
                    let row = values.row(chunk * CHUNK_NODES + offset).transpose();
                    acc.ger(1.0, &mono, &row, 1.0);
                }
                acc
            })
            .collect();

        let mut coefficients = DMatrix::zeros(nb, n_out);
        for partial in &partials {
            coefficients += partial;
        }

        if rescale {
            coefficients *= self.ctx.rescale_factor();
        }
        Ok(coefficients)
    }

    pub fn project_monomial(&self, degree: usize, values: &DVector<f64>, rescale: bool) -> Result<DVector<f64>> {
        let as_matrix = DMatrix::from_column_slice(values.len(), 1, values.as_slice());
        let projected = self.project_monomials(degree, &as_matrix, rescale)?;
        Ok(projected.column(0).into_owned())
    }

    /// Coefficients in the orthonormal Hermite basis of the solver's degree.
    pub fn project_hermite(&self, values: &DMatrix<f64>, rescale: bool) -> Result<DMatrix<f64>> {
        let hermite = self.basis.hermite();
        let monomial = self.project_monomials(hermite.degree(), values, rescale)?;
        Ok(hermite.to_hermite(&monomial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use homsde_core::{gaussian_density, MeasureStatistics};

    fn setup(variances: Vec<f64>, degree: usize, n_nodes: usize) -> (SpectralBasis, CellContext, MeasureStatistics) {
        let n = variances.len();
        let stats = MeasureStatistics::diagonal(DVector::zeros(n), DVector::from_vec(variances)).unwrap();
        let basis = SpectralBasis::new(degree, n, n_nodes).unwrap();
        let ctx = CellContext::new(&stats, &vec![1.0; n], 1.0).unwrap();
        (basis, ctx, stats)
    }

    #[test]
    fn test_monomial_moments() {
        let (basis, ctx, _) = setup(vec![1.0, 1.0], 2, 5);
        let projector = FunctionProjector::new(&basis, &ctx).unwrap();
        let weights = projector.weighted(|_, _| 1.0);
        let moments = projector.project_monomial(4, &weights, false).unwrap();

        let indices = basis.indices();
        assert_relative_eq!(moments[0], 1.0, epsilon = 1e-13);
        assert_relative_eq!(moments[indices.index_of(&[2, 0]).unwrap()], 1.0, epsilon = 1e-12);
        assert_relative_eq!(moments[indices.index_of(&[0, 4]).unwrap()], 3.0, epsilon = 1e-12);
        assert_relative_eq!(moments[indices.index_of(&[2, 2]).unwrap()], 1.0, epsilon = 1e-12);
        assert!(moments[indices.index_of(&[1, 0]).unwrap()].abs() < 1e-13);
        assert!(moments[indices.index_of(&[3, 1]).unwrap()].abs() < 1e-12);
    }

    #[test]
    fn test_discretize_reports_bad_rows() {
        let (basis, ctx, stats) = setup(vec![1.0], 2, 5);
        let projector = FunctionProjector::new(&basis, &ctx).unwrap();

        let short = projector.discretize(2, |y| gaussian_density(&stats, y), |y| Ok(y.clone()));
        assert!(matches!(
            short,
            Err(HomError::DimensionMismatch { what: "discretized function", expected: 2, found: 1 })
        ));

        let failing = projector.discretize(1, |y| gaussian_density(&stats, y), |y| {
            if y[0] > 0.0 {
                Err(HomError::InvalidConfig("outside the domain".to_string()))
            } else {
                Ok(y.clone())
            }
        });
        assert!(matches!(failing, Err(HomError::InvalidConfig(_))));
    }

    #[test]
    fn test_hermite_projection_of_polynomial() {
        // f(y) = y0 y1 - y1² in a Gaussian with variances (2, 0.5)
        let (basis, ctx, stats) = setup(vec![2.0, 0.5], 3, 6);
        let projector = FunctionProjector::new(&basis, &ctx).unwrap();
        let values = projector
            .discretize(1, |y| gaussian_density(&stats, y), |y| Ok(DVector::from_element(1, y[0] * y[1] - y[1] * y[1])))
            .unwrap();
        let coeffs = projector.project_hermite(&values, true).unwrap();

        // y0 y1 = z0 z1 and y1² = (1 + sqrt2 h2(z1)) / 2, with ψ_m = h_m sqrt(φ/det^{1/2})
        let indices = basis.indices();
        let c11 = coeffs[(indices.index_of(&[1, 1]).unwrap(), 0)];
        let c02 = coeffs[(indices.index_of(&[0, 2]).unwrap(), 0)];
        assert_relative_eq!(c11, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c02, -2f64.sqrt() / 2.0, epsilon = 1e-12);
        assert_relative_eq!(coeffs[(0, 0)], -0.5, epsilon = 1e-12);
        assert!(coeffs[(indices.index_of(&[2, 0]).unwrap(), 0)].abs() < 1e-12);
    }

    #[test]
    fn test_projection_independent_of_chunking() {
        let (basis, ctx, _) = setup(vec![1.0, 1.0, 1.0], 2, 8);
        assert!(basis.quadrature().len() > CHUNK_NODES);
        let projector = FunctionProjector::new(&basis, &ctx).unwrap();
        let values = projector.weighted(|z, _| (z[0] + 0.3 * z[2]).sin());

        let fast = projector.project_monomial(4, &values, false).unwrap();
        let mut serial = DVector::zeros(fast.len());
        let parents = basis.indices().parents();
        for (z, v) in basis.quadrature().nodes().iter().zip(values.iter()) {
            let mut mono = DVector::from_element(fast.len(), 1.0);
            for j in 1..fast.len() {
                let (p, d) = parents[j];
                mono[j] = mono[p] * z[d];
            }
            serial += mono * *v;
        }
        for j in 0..fast.len() {
            assert_relative_eq!(fast[j], serial[j], epsilon = 1e-13);
        }
    }

    #[test]
    fn test_degree_above_product_set() {
        let (basis, ctx, _) = setup(vec![1.0], 2, 4);
        let projector = FunctionProjector::new(&basis, &ctx).unwrap();
        let values = projector.weighted(|_, _| 1.0);
        assert!(matches!(
            projector.project_monomial(5, &values, false),
            Err(HomError::DegreeTooHigh { degree: 5, max: 4 })
        ));
    }
}
