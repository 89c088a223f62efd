//! Tensor-product Gauss-Hermite quadrature against the standard normal density.

use homsde_core::{HomError, Result};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Cubature rule for E[f(Z)], Z ~ N(0, I_n). The 1-D rule with `n` nodes
/// integrates polynomials up to degree 2n - 1 exactly.
#[derive(Clone, Debug)]
pub struct QuadratureRule {
    n_dims: usize,
    nodes: Vec<DVector<f64>>,
    weights: Vec<f64>,
}

impl QuadratureRule {
    pub fn gauss_hermite(n_nodes: usize, n_dims: usize) -> Result<Self> {
        if n_nodes == 0 || n_dims == 0 {
            return Err(HomError::InvalidConfig(format!(
                "quadrature needs at least one node and one dimension, got {} nodes in {} dimensions",
                n_nodes, n_dims
            )));
        }

        let (nodes_1d, weights_1d) = golub_welsch(n_nodes);

        let total = n_nodes.checked_pow(n_dims as u32).ok_or_else(|| {
            HomError::InvalidConfig(format!(
                "{} nodes in {} dimensions overflows the tensor grid",
                n_nodes, n_dims
            ))
        })?;

        // Last dimension varies fastest.
        let mut nodes = Vec::with_capacity(total);
        let mut weights = Vec::with_capacity(total);
        let mut digits = vec![0usize; n_dims];
        for _ in 0..total {
            let point = DVector::from_iterator(n_dims, digits.iter().map(|&d| nodes_1d[d]));
            let weight = digits.iter().map(|&d| weights_1d[d]).product();
            nodes.push(point);
            weights.push(weight);

            for slot in digits.iter_mut().rev() {
                *slot += 1;
                if *slot < n_nodes {
                    break;
                }
                *slot = 0;
            }
        }

        Ok(Self {
            n_dims,
            nodes,
            weights,
        })
    }

    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    pub fn nodes(&self) -> &[DVector<f64>] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn integrate<Func>(&self, f: Func) -> f64
    where
        Func: Fn(&DVector<f64>) -> f64,
    {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(z, w)| w * f(z))
            .sum()
    }
}

/// Nodes and weights of the 1-D probabilists' rule from the eigenpairs of
/// the Jacobi matrix (zero diagonal, off-diagonal sqrt(k)).
fn golub_welsch(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut jacobi = DMatrix::zeros(n, n);
    for k in 1..n {
        let b = (k as f64).sqrt();
        jacobi[(k - 1, k)] = b;
        jacobi[(k, k - 1)] = b;
    }

    let eig = SymmetricEigen::new(jacobi);
    let mut pairs: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let v0 = eig.eigenvectors[(0, i)];
            (eig.eigenvalues[i], v0 * v0)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Enforce the exact symmetry of the rule about the origin.
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n {
        let j = n - 1 - i;
        nodes[i] = 0.5 * (pairs[i].0 - pairs[j].0);
        weights[i] = 0.5 * (pairs[i].1 + pairs[j].1);
    }

    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total;
    }

    (nodes, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_one() {
        for n in [1, 2, 5, 20] {
            let rule = QuadratureRule::gauss_hermite(n, 1).unwrap();
            let sum: f64 = rule.weights().iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_three_point_rule() {
        let rule = QuadratureRule::gauss_hermite(3, 1).unwrap();
        let s3 = 3f64.sqrt();
        assert_relative_eq!(rule.nodes()[0][0], -s3, epsilon = 1e-13);
        assert_relative_eq!(rule.nodes()[1][0], 0.0, epsilon = 1e-14);
        assert_relative_eq!(rule.nodes()[2][0], s3, epsilon = 1e-13);
        assert_relative_eq!(rule.weights()[0], 1.0 / 6.0, epsilon = 1e-13);
        assert_relative_eq!(rule.weights()[1], 2.0 / 3.0, epsilon = 1e-13);
    }

    #[test]
    fn test_gaussian_moments_exact() {
        let rule = QuadratureRule::gauss_hermite(6, 1).unwrap();
        // E[Z^{2k}] = (2k-1)!!
        let expected = [1.0, 1.0, 3.0, 15.0, 105.0, 945.0];
        for (k, &e) in expected.iter().enumerate() {
            let m = rule.integrate(|z| z[0].powi(2 * k as i32));
            assert_relative_eq!(m, e, max_relative = 1e-12);
            let odd = rule.integrate(|z| z[0].powi(2 * k as i32 + 1));
            assert!(odd.abs() < 1e-10);
        }
    }

    #[test]
    fn test_tensor_grid() {
        let rule = QuadratureRule::gauss_hermite(4, 3).unwrap();
        assert_eq!(rule.len(), 64);
        assert_eq!(rule.n_dims(), 3);
        let cross = rule.integrate(|z| z[0] * z[0] * z[1] * z[1] * z[2] * z[2]);
        assert_relative_eq!(cross, 1.0, max_relative = 1e-12);
        let mixed = rule.integrate(|z| z[0].powi(4) * z[2].powi(2));
        assert_relative_eq!(mixed, 3.0, max_relative = 1e-12);
        // last dimension fastest
        assert_eq!(rule.nodes()[0][0], rule.nodes()[1][0]);
        assert!(rule.nodes()[0][2] < rule.nodes()[1][2]);
    }

    #[test]
    fn test_rejects_empty_rule() {
        assert!(QuadratureRule::gauss_hermite(0, 2).is_err());
        assert!(QuadratureRule::gauss_hermite(3, 0).is_err());
    }
}
