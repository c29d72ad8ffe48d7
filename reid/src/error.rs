use thiserror::Error;

/// Errors returned by re-identification operations.
#[derive(Debug, Error)]
pub enum ReidError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("identity not found: {0}")]
    NotFound(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("store error: {0}")]
    Store(String),
}
