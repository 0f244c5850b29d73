use thiserror::Error;

/// Core error type shared across Rowsmith crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The profile asked for something that violates internal invariants.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    /// A transformation that is not defined for the given shape, such as
    /// negating an offset relation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for results returned by Rowsmith crates.
pub type Result<T> = std::result::Result<T, Error>;
