//! GemFall synchronization layer
//!
//! Keeps a remote renderer in lockstep with the authoritative spin
//! simulation: typed wire protocol (`protocol`), per-spin session state
//! machine with hash validation and recovery (`session`), the async step
//! delivery driver (`delivery`), and the append-only spin history
//! (`audit`).

pub mod audit;
pub mod delivery;
pub mod error;
pub mod protocol;
pub mod session;

pub use audit::AuditLog;
pub use delivery::{DeliveryConfig, DeliveryOutcome, SessionDriver, StepTransport};
pub use error::SyncError;
pub use protocol::{ClientReportKind, DesyncCause, GameMessage, RecoveryType};
pub use session::{AckOutcome, SessionState, SyncSession};
