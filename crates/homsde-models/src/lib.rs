pub mod ou_sine;
pub mod quadratic;
pub mod triple_well;

pub use ou_sine::OuSine;
pub use quadratic::Quadratic1d;
pub use triple_well::TripleWell;
