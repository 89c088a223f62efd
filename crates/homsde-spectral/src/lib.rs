//! Hermite-Galerkin solver for the cell problem of a slow/fast SDE system.
//!
//! At each slow state the generator of the fast process is conjugated by
//! √ρ, discretized in the Hermite functions of a Gaussian fitted to the
//! invariant measure ρ, and the resulting symmetric system is solved for
//! the drift components and their slow derivatives. The homogenized drift
//! and diffusion follow by averaging.

pub mod multi_index;
pub mod hermite;
pub mod quadrature;
pub mod config;
pub mod basis;
pub mod context;
pub mod projector;
pub mod assembler;
pub mod solver;
pub mod analyser;

pub use homsde_core::{HomError, Result};

pub use multi_index::{MultiIndex, MultiIndexSet};
pub use hermite::{HermiteTable, MAX_DEGREE};
pub use quadrature::QuadratureRule;
pub use config::SpectralConfig;
pub use basis::SpectralBasis;
pub use context::CellContext;
pub use projector::FunctionProjector;
pub use assembler::GalerkinAssembler;
pub use solver::{compute_averages, solve_cell_problem, symmetric_sqrt, SpectralSolver};
pub use analyser::PotentialMeasure;
