use thiserror::Error;

/// Errors raised by the grid, the frontier and the generation engines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifeError {
    #[error("cell ({row}, {column}) is outside the {width}x{height} grid")]
    OutOfRange {
        row: usize,
        column: usize,
        width: usize,
        height: usize,
    },
    #[error("index {index} is outside the grid of {len} cells")]
    IndexOutOfRange { index: usize, len: usize },
    /// Internal consistency fault: the frontier holds a coordinate whose
    /// row/column do not match its flat index.
    #[error("frontier member {index} claims ({row}, {column}), which does not match its index")]
    InvalidFrontierMember {
        index: usize,
        row: usize,
        column: usize,
    },
    #[error("grid dimensions {width}x{height} must both be non-zero")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LifeError>;
