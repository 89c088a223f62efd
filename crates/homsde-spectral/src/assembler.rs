use crate::projector::FunctionProjector;
use homsde_core::{FastGenerator, Result, State};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Builds the Galerkin matrix of the negative generator, conjugated by √ρ,
/// in the Hermite functions of the reference Gaussian.
pub struct GalerkinAssembler<'p, 'a> {
    projector: &'p FunctionProjector<'a>,
}

impl<'p, 'a> GalerkinAssembler<'p, 'a> {
    pub fn new(projector: &'p FunctionProjector<'a>) -> Self {
        Self { projector }
    }

    /// Symmetric matrix of size C(degree + n, n).
    ///
    /// The potential part comes from projecting the gap between the
    /// Gaussian and the actual zero-order terms onto monomials of twice the
    /// basis degree; the kinetic part is diagonal, (s²/2) Σ_k m_k / λ_k.
    /// Only the lower triangle is computed and mirrored.
    pub fn compute_matrix<G>(&self, problem: &G, x: &State) -> Result<DMatrix<f64>>
    where
        G: FastGenerator + ?Sized,
    {
        let basis = self.projector.basis();
        let ctx = self.projector.context();
        let nb = basis.len();

        let gap = self
            .projector
            .weighted(|z, y| ctx.gaussian_linear_term(z) - problem.linear_term(x, y));
        let moments = self.projector.project_monomial(2 * basis.degree(), &gap, false)?;

        let products = DMatrix::from_fn(nb, nb, |i, j| moments[basis.product_index(i, j)]);
        let hermite_t = basis.hermite().coefficients().transpose();
        let half_transformed = &products * &hermite_t;

        let lower: Vec<Vec<f64>> = (0..nb)
            .into_par_iter()
            .map(|i| {
                (0..=i)
                    .map(|j| hermite_t.column(i).dot(&half_transformed.column(j)))
                    .collect()
            })
            .collect();

        let mut matrix = DMatrix::zeros(nb, nb);
        for (i, (row, m)) in lower.iter().zip(basis.indices().iter()).enumerate() {
            let kinetic: f64 = m
                .iter()
                .zip(ctx.eig_val.iter())
                .map(|(&mk, lambda)| mk as f64 / lambda)
                .sum();
            for (j, &value) in row.iter().enumerate() {
                matrix[(i, j)] = value;
                matrix[(j, i)] = value;
            }
            matrix[(i, i)] += 0.5 * ctx.noise_sq * kinetic;
        }

        Ok(matrix)
    }
}
