//! Synchronization error taxonomy
//!
//! Desyncs are recoverable and handled by the session state machine up to
//! its retry ceiling; `RecoveryExhausted` is terminal for the session but
//! never for the spin outcome — the caller downgrades to the
//! non-interactive full-result path.

use crate::protocol::DesyncCause;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("desync: {cause}")]
    Desync { cause: DesyncCause },

    #[error("recovery ceiling exceeded for session {session_id}")]
    RecoveryExhausted { session_id: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("session {0} is not accepting messages")]
    SessionClosed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] gf_engine::EngineError),
}
