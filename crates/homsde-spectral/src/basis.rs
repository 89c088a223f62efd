use crate::hermite::HermiteTable;
use crate::multi_index::MultiIndexSet;
use crate::quadrature::QuadratureRule;
use homsde_core::Result;

/// Immutable tables shared by every estimator call for a fixed
/// (degree, fast dimension, node count).
#[derive(Clone, Debug)]
pub struct SpectralBasis {
    degree: usize,
    n_dims: usize,
    /// Multi-indices up to twice the basis degree, for products of basis functions.
    indices: MultiIndexSet,
    hermite: HermiteTable,
    quadrature: QuadratureRule,
    /// Row-major nb × nb table of the linear index of m_i + m_j.
    product_index: Vec<usize>,
}

impl SpectralBasis {
    pub fn new(degree: usize, n_dims: usize, n_nodes: usize) -> Result<Self> {
        let indices = MultiIndexSet::new(n_dims, 2 * degree)?;
        let hermite = HermiteTable::new(&indices, degree)?;
        let quadrature = QuadratureRule::gauss_hermite(n_nodes, n_dims)?;

        let nb = hermite.len();
        let mut product_index = Vec::with_capacity(nb * nb);
        for i in 0..nb {
            for j in 0..nb {
                product_index.push(indices.index_of_sum(i, j)?);
            }
        }

        Ok(Self {
            degree,
            n_dims,
            indices,
            hermite,
            quadrature,
            product_index,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    /// Number of basis functions of degree ≤ `degree`.
    pub fn size(&self, degree: usize) -> usize {
        self.indices.len_up_to(degree)
    }

    /// Number of basis functions at full degree.
    pub fn len(&self) -> usize {
        self.hermite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hermite.is_empty()
    }

    pub fn indices(&self) -> &MultiIndexSet {
        &self.indices
    }

    pub fn hermite(&self) -> &HermiteTable {
        &self.hermite
    }

    pub fn quadrature(&self) -> &QuadratureRule {
        &self.quadrature
    }

    /// Linear index of m_i + m_j for basis indices i, j.
    pub fn product_index(&self, i: usize, j: usize) -> usize {
        self.product_index[i * self.len() + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let basis = SpectralBasis::new(3, 2, 7).unwrap();
        assert_eq!(basis.len(), 10);
        assert_eq!(basis.size(1), 3);
        assert_eq!(basis.indices().len(), 28);
        assert_eq!(basis.quadrature().len(), 49);
    }

    #[test]
    fn test_product_index() {
        let basis = SpectralBasis::new(2, 2, 3).unwrap();
        let indices = basis.indices();
        let i = indices.index_of(&[0, 1]).unwrap();
        let j = indices.index_of(&[2, 0]).unwrap();
        assert_eq!(indices.get(basis.product_index(i, j)), Some(&[2, 1][..]));
        assert_eq!(basis.product_index(i, j), basis.product_index(j, i));
        assert_eq!(basis.product_index(0, j), j);
    }

    #[test]
    fn test_degree_cap() {
        assert!(SpectralBasis::new(40, 1, 3).is_ok());
        assert!(SpectralBasis::new(41, 1, 3).is_err());
    }
}
