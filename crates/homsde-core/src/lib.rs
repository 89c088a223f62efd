pub mod state;
pub mod coupling;
pub mod generator;
pub mod measure;
pub mod estimator;
pub mod error;

// Core types
pub use state::{State, SdeCoeffs};
pub use error::{HomError, Result};

// Problem traits
pub use coupling::SlowCoupling;
pub use generator::{FastGenerator, FastPotential, Problem};

// Invariant measure of the fast process
pub use measure::{InvariantMeasure, MeasureStatistics, GaussianMeasure, gaussian_density};

// Solver seam
pub use estimator::Estimator;
