use thiserror::Error;

/// Faults inside the analytics engines. User-facing computations never let
/// these escape: unexpected faults are logged and replaced by a documented
/// fallback. Too little data is not an error at all; it surfaces as a status
/// value on the result (`Regularity::InsufficientData`,
/// `Prediction::Unavailable` and friends).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("computation failed: {0}")]
    Computation(String),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
