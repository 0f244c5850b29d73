use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Core(#[from] rowsmith_core::Error),
    #[error(transparent)]
    Profile(#[from] rowsmith_profile::ProfileError),
    #[error("emitted {emitted} of {requested} requested rows before the attempt budget ran out")]
    Exhausted { emitted: u64, requested: u64 },
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;
