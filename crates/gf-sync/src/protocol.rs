//! Wire protocol
//!
//! Logical message types exchanged with the renderer over a persistent
//! bidirectional channel. JSON with a `type` tag; field names are
//! snake_case to match the renderer's expectations. The transport itself
//! (WebSocket, or the synchronous request/response fallback) lives outside
//! this crate.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use gf_engine::cascade::{FreeSpinsState, SpinMetadata};
use gf_engine::grid::{Cluster, Grid};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// What the renderer reported when it raised a desync itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientReportKind {
    /// Renderer's recomputed state disagrees with the delivered hash
    StateMismatch,
    /// Renderer's clock has drifted from the server timeline
    TimingDrift,
    /// Renderer lost its grid state entirely (reload, crash recovery)
    StateLost,
}

/// Why a session desynced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesyncCause {
    /// Acknowledgment hash differs from the authoritative step hash
    HashMismatch { step_index: u32 },
    /// No acknowledgment within the timeout
    AckTimeout { step_index: u32 },
    /// Acknowledgment for a step other than the one awaiting it
    OutOfOrderAck { expected: u32, received: u32 },
    /// Explicit desync report from the renderer
    ClientReport {
        step_index: u32,
        report: ClientReportKind,
    },
}

impl std::fmt::Display for DesyncCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesyncCause::HashMismatch { step_index } => {
                write!(f, "hash mismatch at step {step_index}")
            }
            DesyncCause::AckTimeout { step_index } => {
                write!(f, "acknowledgment timeout at step {step_index}")
            }
            DesyncCause::OutOfOrderAck { expected, received } => {
                write!(f, "out-of-order ack (expected {expected}, got {received})")
            }
            DesyncCause::ClientReport { step_index, report } => {
                write!(f, "client report {report:?} at step {step_index}")
            }
        }
    }
}

/// Recovery strategy selected from a desync's cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    /// Push the authoritative grid state for the disputed step
    StateResync,
    /// Resend the step unchanged
    StepReplay,
    /// Resend the server/client time offset
    TimingAdjustment,
    /// Push the entire remaining step sequence and current feature state
    FullResync,
}

impl RecoveryType {
    /// Cause → strategy mapping.
    pub fn for_cause(cause: &DesyncCause) -> Self {
        match cause {
            DesyncCause::HashMismatch { .. } => RecoveryType::StateResync,
            DesyncCause::AckTimeout { .. } => RecoveryType::StepReplay,
            DesyncCause::OutOfOrderAck { .. } => RecoveryType::FullResync,
            DesyncCause::ClientReport { report, .. } => match report {
                ClientReportKind::StateMismatch => RecoveryType::StateResync,
                ClientReportKind::TimingDrift => RecoveryType::TimingAdjustment,
                ClientReportKind::StateLost => RecoveryType::FullResync,
            },
        }
    }
}

/// Typed recovery payloads, one per strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recovery_type", rename_all = "snake_case")]
pub enum RecoveryPayload {
    StateResync { step_index: u32, grid: Grid },
    StepReplay { step_index: u32 },
    TimingAdjustment { server_time: f64, offset_ms: f64 },
    FullResync {
        resume_step: u32,
        grid: Grid,
        feature: Option<FreeSpinsState>,
    },
}

/// All messages on the channel, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameMessage {
    /// Client → server: start a spin
    SpinRequest {
        bet_amount: f64,
        quick_spin_mode: bool,
    },
    /// Server → client: session opened for a resolved spin
    SyncSessionStart {
        session_id: String,
        expected_steps: u32,
        server_start_time: f64,
    },
    /// Server → client: one cascade step with its validation hash
    CascadeStep {
        session_id: String,
        step_index: u32,
        grid_before: Grid,
        grid_after: Grid,
        clusters: Vec<Cluster>,
        step_win: f64,
        validation_hash: String,
        timestamp: f64,
    },
    /// Client → server: renderer confirms a step it re-validated
    StepAcknowledgment {
        session_id: String,
        step_index: u32,
        client_timestamp: f64,
        recomputed_hash: String,
    },
    /// Either direction: a desync was detected
    DesyncDetected {
        session_id: String,
        cause: DesyncCause,
    },
    /// Server → client: remediation for a desync
    RecoveryData {
        session_id: String,
        payload: RecoveryPayload,
    },
    /// Server → client: terminal message with the authoritative outcome
    SpinComplete {
        session_id: String,
        final_grid: Grid,
        total_win: f64,
        total_multiplier: u32,
        metadata: SpinMetadata,
    },
    /// Server → client: request rejected or failed
    Error { code: String, message: String },
}

impl GameMessage {
    /// Short name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            GameMessage::SpinRequest { .. } => "spin_request",
            GameMessage::SyncSessionStart { .. } => "sync_session_start",
            GameMessage::CascadeStep { .. } => "cascade_step",
            GameMessage::StepAcknowledgment { .. } => "step_acknowledgment",
            GameMessage::DesyncDetected { .. } => "desync_detected",
            GameMessage::RecoveryData { .. } => "recovery_data",
            GameMessage::SpinComplete { .. } => "spin_complete",
            GameMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_tag() {
        let msg = GameMessage::SpinRequest {
            bet_amount: 1.0,
            quick_spin_mode: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"spin_request\""));
        assert!(json.contains("\"bet_amount\":1.0"));

        let back: GameMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_recovery_mapping_per_cause() {
        assert_eq!(
            RecoveryType::for_cause(&DesyncCause::HashMismatch { step_index: 2 }),
            RecoveryType::StateResync
        );
        assert_eq!(
            RecoveryType::for_cause(&DesyncCause::AckTimeout { step_index: 0 }),
            RecoveryType::StepReplay
        );
        assert_eq!(
            RecoveryType::for_cause(&DesyncCause::OutOfOrderAck {
                expected: 1,
                received: 3
            }),
            RecoveryType::FullResync
        );
        assert_eq!(
            RecoveryType::for_cause(&DesyncCause::ClientReport {
                step_index: 1,
                report: ClientReportKind::TimingDrift
            }),
            RecoveryType::TimingAdjustment
        );
    }

    #[test]
    fn test_recovery_type_wire_name() {
        let json = serde_json::to_string(&RecoveryType::StateResync).unwrap();
        assert_eq!(json, "\"state_resync\"");
    }

    #[test]
    fn test_ack_roundtrip() {
        let ack = GameMessage::StepAcknowledgment {
            session_id: "s-1".into(),
            step_index: 4,
            client_timestamp: 123.0,
            recomputed_hash: "abc".into(),
        };
        let json = serde_json::to_string(&ack).unwrap();
        let back: GameMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ack);
    }
}
