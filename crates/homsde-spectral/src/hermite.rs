//! Monomial coefficients of the normalized probabilists' Hermite
//! polynomials h_n = He_n / sqrt(n!), orthonormal under N(0, 1).

use crate::multi_index::MultiIndexSet;
use homsde_core::{HomError, Result};
use nalgebra::DMatrix;

/// Highest tabulated polynomial degree.
pub const MAX_DEGREE: usize = 40;

/// Row n holds the coefficients of x^0..x^n in h_n.
///
/// Built from h_{n+1} = (x h_n - sqrt(n) h_{n-1}) / sqrt(n+1). Every
/// nonzero coefficient of a given power keeps the same sign along the
/// recurrence, so no cancellation occurs.
pub fn hermite_coefficients(degree: usize) -> Result<DMatrix<f64>> {
    if degree > MAX_DEGREE {
        return Err(HomError::DegreeTooHigh {
            degree,
            max: MAX_DEGREE,
        });
    }

    let size = degree + 1;
    let mut table = DMatrix::zeros(size, size);
    table[(0, 0)] = 1.0;
    if degree >= 1 {
        table[(1, 1)] = 1.0;
    }

    for n in 1..degree {
        let a = 1.0 / ((n + 1) as f64).sqrt();
        let b = (n as f64).sqrt();
        for k in 0..=n + 1 {
            let shifted = if k > 0 { table[(n, k - 1)] } else { 0.0 };
            let previous = if k < n { table[(n - 1, k)] } else { 0.0 };
            table[(n + 1, k)] = a * (shifted - b * previous);
        }
    }

    Ok(table)
}

/// Tensor-product coefficients: entry (i, j) is the coefficient of the
/// monomial z^{m_j} in the Hermite polynomial H_{m_i}, for the first
/// C(degree + n, n) multi-indices of `indices`.
pub fn tensorize(table_1d: &DMatrix<f64>, indices: &MultiIndexSet, degree: usize) -> Result<DMatrix<f64>> {
    if degree >= table_1d.nrows() || degree > indices.degree() {
        return Err(HomError::DegreeTooHigh {
            degree,
            max: (table_1d.nrows().saturating_sub(1)).min(indices.degree()),
        });
    }

    let nb = indices.len_up_to(degree);
    let n_dims = indices.n_dims();
    let mut out = DMatrix::zeros(nb, nb);

    for (i, mi) in indices.iter().take(nb).enumerate() {
        for (j, mj) in indices.iter().take(nb).enumerate() {
            let mut product = 1.0;
            for k in 0..n_dims {
                product *= table_1d[(mi[k], mj[k])];
                if product == 0.0 {
                    break;
                }
            }
            out[(i, j)] = product;
        }
    }

    Ok(out)
}

/// One- and n-dimensional coefficient tables for a fixed (degree, n_dims).
#[derive(Clone, Debug)]
pub struct HermiteTable {
    degree: usize,
    table_1d: DMatrix<f64>,
    table_nd: DMatrix<f64>,
}

impl HermiteTable {
    pub fn new(indices: &MultiIndexSet, degree: usize) -> Result<Self> {
        let table_1d = hermite_coefficients(degree)?;
        let table_nd = tensorize(&table_1d, indices, degree)?;
        Ok(Self {
            degree,
            table_1d,
            table_nd,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of n-dimensional basis functions.
    pub fn len(&self) -> usize {
        self.table_nd.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.table_nd.nrows() == 0
    }

    pub fn one_dimensional(&self) -> &DMatrix<f64> {
        &self.table_1d
    }

    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.table_nd
    }

    /// h_n(x) by Horner's rule on row n.
    pub fn evaluate_1d(&self, n: usize, x: f64) -> f64 {
        if n > self.degree {
            return 0.0;
        }
        (0..=n).rev().fold(0.0, |acc, k| acc * x + self.table_1d[(n, k)])
    }

    /// Convert monomial moments to Hermite coefficients (leading block).
    pub fn to_hermite(&self, monomial: &DMatrix<f64>) -> DMatrix<f64> {
        let nb = self.len();
        &self.table_nd * monomial.rows(0, nb)
    }
}
