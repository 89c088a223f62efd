use crate::{Result, SdeCoeffs, State};

/// Anything that turns a slow state into effective SDE coefficients.
pub trait Estimator {
    fn estimate(&self, x: &State) -> Result<SdeCoeffs>;
}
