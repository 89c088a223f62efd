//! Bijection between bounded-degree multi-indices and linear indices.
//!
//! Multi-indices are ordered by ascending total degree and, inside a
//! degree class, in ascending lexicographic order:
//!
//! ```text
//! n = 2:  (0,0) | (0,1) (1,0) | (0,2) (1,1) (2,0) | ...
//! ```
//!
//! Because the order is graded, the multi-indices of degree ≤ d are
//! exactly the first C(d+n, n) entries for every d, so lower-degree
//! Galerkin systems are leading principal submatrices of higher-degree
//! ones. Both directions of the mapping use the combinatorial number
//! system in closed form.

use homsde_core::{HomError, Result};

/// Largest total degree a multi-index set may be built for. Products of
/// two Hermite basis functions of degree ≤ 40 reach degree 80.
pub const MAX_INDEX_DEGREE: usize = 80;

pub type MultiIndex = Vec<usize>;

/// Binomial coefficient C(n, k), or `None` if it does not fit in `usize`.
pub fn checked_binomial(n: usize, k: usize) -> Option<usize> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result = 1u128;
    for i in 0..k {
        result = result.checked_mul((n - i) as u128)? / (i as u128 + 1);
        if result > usize::MAX as u128 {
            return None;
        }
    }
    usize::try_from(result).ok()
}

/// Binomial coefficient C(n, k), exact in integer arithmetic. Saturates at
/// `usize::MAX`; shapes accepted by [`check_shape`] never reach it.
pub fn binomial(n: usize, k: usize) -> usize {
    checked_binomial(n, k).unwrap_or(usize::MAX)
}

/// Number of multi-indices of length `n_dims` with total degree ≤ `degree`.
pub fn count(degree: usize, n_dims: usize) -> usize {
    binomial(degree + n_dims, n_dims)
}

/// Number of multi-indices with total degree strictly below `degree`.
fn count_below(degree: usize, n_dims: usize) -> usize {
    if degree == 0 {
        0
    } else {
        count(degree - 1, n_dims)
    }
}

/// All multi-indices of total degree ≤ `degree`, in linear-index order.
pub fn enumerate(degree: usize, n_dims: usize) -> Result<Vec<MultiIndex>> {
    check_shape(degree, n_dims)?;

    let mut out = Vec::with_capacity(count(degree, n_dims));
    for total in 0..=degree {
        let mut current = vec![0; n_dims];
        current[n_dims - 1] = total;
        loop {
            out.push(current.clone());
            if !advance_in_class(&mut current) {
                break;
            }
        }
    }
    Ok(out)
}

/// Lexicographic successor within a degree class. Returns false on the
/// last element (all mass in the first component).
fn advance_in_class(m: &mut [usize]) -> bool {
    let n = m.len();
    let mut tail = 0;
    for k in (0..n.saturating_sub(1)).rev() {
        tail += m[k + 1];
        if tail > 0 {
            m[k] += 1;
            for entry in m[k + 1..].iter_mut() {
                *entry = 0;
            }
            m[n - 1] = tail - 1;
            return true;
        }
    }
    false
}

/// Linear index of `m`; fails if its degree exceeds `degree_bound`.
pub fn to_linear_index(m: &[usize], degree_bound: usize) -> Result<usize> {
    let n = m.len();
    check_shape(degree_bound, n)?;

    let total: usize = m.iter().sum();
    if total > degree_bound {
        return Err(HomError::DegreeTooHigh {
            degree: total,
            max: degree_bound,
        });
    }

    let mut rank = 0;
    let mut remaining = total;
    for k in 0..n - 1 {
        // Members of the class that agree with m before position k and
        // carry less than m[k] at position k (hockey-stick identity).
        let free = n - k - 1;
        rank += binomial(remaining + free, free) - binomial(remaining - m[k] + free, free);
        remaining -= m[k];
    }

    Ok(count_below(total, n) + rank)
}

/// Inverse of [`to_linear_index`].
pub fn to_multi_index(index: usize, degree_bound: usize, n_dims: usize) -> Result<MultiIndex> {
    check_shape(degree_bound, n_dims)?;

    let len = count(degree_bound, n_dims);
    if index >= len {
        return Err(HomError::IndexOutOfRange { index, len });
    }

    let mut total = 0;
    while count(total, n_dims) <= index {
        total += 1;
    }

    let mut rank = index - count_below(total, n_dims);
    let mut remaining = total;
    let mut m = vec![0; n_dims];
    for k in 0..n_dims - 1 {
        let free = n_dims - k - 1;
        let mut value = 0;
        loop {
            let completions = binomial(remaining - value + free - 1, free - 1);
            if rank < completions {
                break;
            }
            rank -= completions;
            value += 1;
        }
        m[k] = value;
        remaining -= value;
    }
    m[n_dims - 1] = remaining;

    Ok(m)
}

fn check_shape(degree: usize, n_dims: usize) -> Result<()> {
    if n_dims == 0 {
        return Err(HomError::InvalidConfig(
            "multi-indices need at least one dimension".to_string(),
        ));
    }
    if degree > MAX_INDEX_DEGREE {
        return Err(HomError::DegreeTooHigh {
            degree,
            max: MAX_INDEX_DEGREE,
        });
    }
    if checked_binomial(degree + n_dims, n_dims).is_none() {
        return Err(HomError::InvalidConfig(format!(
            "too many multi-indices of degree {} in {} dimensions",
            degree, n_dims
        )));
    }
    Ok(())
}

/// Precomputed enumeration with the degree-decrement map used to build
/// monomials incrementally.
#[derive(Clone, Debug)]
pub struct MultiIndexSet {
    n_dims: usize,
    degree: usize,
    indices: Vec<MultiIndex>,
    /// For index i > 0: (index of m with one exponent decremented, that dimension).
    parents: Vec<(usize, usize)>,
}

impl MultiIndexSet {
    pub fn new(n_dims: usize, degree: usize) -> Result<Self> {
        let indices = enumerate(degree, n_dims)?;

        let mut parents = Vec::with_capacity(indices.len());
        parents.push((0, 0));
        for m in indices.iter().skip(1) {
            let dim = m.iter().position(|&e| e > 0).unwrap_or(0);
            let mut lower = m.clone();
            lower[dim] -= 1;
            parents.push((to_linear_index(&lower, degree)?, dim));
        }

        Ok(Self {
            n_dims,
            degree,
            indices,
            parents,
        })
    }

    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of multi-indices of degree ≤ `degree`, i.e. the size of the
    /// leading block for that degree.
    pub fn len_up_to(&self, degree: usize) -> usize {
        count(degree.min(self.degree), self.n_dims)
    }

    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.indices.get(index).map(|m| m.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.iter().map(|m| m.as_slice())
    }

    pub fn parent(&self, index: usize) -> (usize, usize) {
        self.parents[index]
    }

    pub fn parents(&self) -> &[(usize, usize)] {
        &self.parents
    }

    pub fn index_of(&self, m: &[usize]) -> Result<usize> {
        if m.len() != self.n_dims {
            return Err(HomError::DimensionMismatch {
                what: "multi-index",
                expected: self.n_dims,
                found: m.len(),
            });
        }
        to_linear_index(m, self.degree)
    }

    /// Linear index of the sum of the multi-indices at `i` and `j`.
    pub fn index_of_sum(&self, i: usize, j: usize) -> Result<usize> {
        let (a, b) = match (self.indices.get(i), self.indices.get(j)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(HomError::IndexOutOfRange {
                    index: i.max(j),
                    len: self.len(),
                })
            }
        };
        let sum: MultiIndex = a.iter().zip(b).map(|(x, y)| x + y).collect();
        to_linear_index(&sum, self.degree)
    }
}
