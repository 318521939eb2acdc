//! Engine error taxonomy

/// Errors raised by the simulation core.
///
/// `Validation` rejects a request before any state is touched; `Generator`
/// is fatal for the request — the engine never falls back to a different
/// randomness source once a mode has been chosen.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("random generator failure: {0}")]
    Generator(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
