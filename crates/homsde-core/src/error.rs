use thiserror::Error;

/// Errors raised while configuring or running an estimator.
#[derive(Debug, Error)]
pub enum HomError {
    #[error("polynomial degree {degree} exceeds the tabulated maximum {max}")]
    DegreeTooHigh { degree: usize, max: usize },

    #[error("variance {value:e} in fast dimension {dim} is not positive")]
    NonPositiveVariance { dim: usize, value: f64 },

    #[error("{what}: expected dimension {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("index {index} out of range for {len} multi-indices")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("dense solve failed: {0}")]
    Solve(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HomError>;
