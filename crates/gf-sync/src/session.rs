//! Synchronization session state machine
//!
//! One session per in-flight spin. The spin is already fully resolved and
//! immutable when the session opens; the session only tracks delivery:
//! which step is current, which acknowledgments arrived, and how many
//! recovery rounds have been spent. Pure and synchronous — the async
//! delivery driver sits on top.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gf_engine::cascade::SpinResult;

use crate::error::SyncError;
use crate::protocol::{DesyncCause, GameMessage, RecoveryPayload, RecoveryType, now_ms};

/// Session lifecycle.
///
/// `Created → Active → Completed`, or
/// `Active → Desynced → Recovering → Active | Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Desynced,
    Recovering,
    Completed,
    Aborted,
}

/// Result of a successfully validated acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Ack accepted; deliver the step at `next` next
    Progressed { next: u32 },
    /// Terminal step acknowledged with every prior step — session complete
    Completed,
}

/// Recovery plan chosen for a desync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPlan {
    pub recovery_type: RecoveryType,
    pub attempt: u32,
}

const RETRY_CEILING: u32 = 3;

/// Per-spin delivery session.
pub struct SyncSession {
    id: String,
    spin_id: String,
    expected_steps: u32,
    current_step: u32,
    /// Authoritative per-step validation hashes
    hashes: Vec<String>,
    acked: Vec<bool>,
    state: SessionState,
    recovery_attempts: u32,
    started_at: f64,
}

impl SyncSession {
    /// Open a session for a fully resolved spin.
    pub fn open(spin: &SpinResult) -> Self {
        let hashes: Vec<String> = spin
            .steps
            .iter()
            .map(|s| s.validation_hash.clone())
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            spin_id: spin.spin_id.clone(),
            expected_steps: hashes.len() as u32,
            current_step: 0,
            acked: vec![false; hashes.len()],
            hashes,
            state: SessionState::Created,
            recovery_attempts: 0,
            started_at: now_ms(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spin_id(&self) -> &str {
        &self.spin_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn expected_steps(&self) -> u32 {
        self.expected_steps
    }

    /// Index of the step currently awaiting acknowledgment.
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    /// Opening message for the renderer.
    pub fn start(&mut self) -> GameMessage {
        if self.state == SessionState::Created {
            self.state = SessionState::Active;
        }
        GameMessage::SyncSessionStart {
            session_id: self.id.clone(),
            expected_steps: self.expected_steps,
            server_start_time: self.started_at,
        }
    }

    fn accepting(&self) -> bool {
        matches!(self.state, SessionState::Active)
    }

    /// Validate an acknowledgment against the session's expectations.
    ///
    /// Steps must be acknowledged in strictly increasing index order; an
    /// out-of-order ack is a protocol violation and surfaces as a desync,
    /// as does a hash that differs from the authoritative one.
    pub fn handle_ack(
        &mut self,
        session_id: &str,
        step_index: u32,
        recomputed_hash: &str,
    ) -> Result<AckOutcome, SyncError> {
        if !self.accepting() {
            return Err(SyncError::SessionClosed(self.id.clone()));
        }
        if session_id != self.id {
            return Err(SyncError::SessionClosed(session_id.to_string()));
        }
        if step_index != self.current_step {
            return Err(self.desync(DesyncCause::OutOfOrderAck {
                expected: self.current_step,
                received: step_index,
            }));
        }
        if self.hashes.get(step_index as usize).map(String::as_str) != Some(recomputed_hash) {
            return Err(self.desync(DesyncCause::HashMismatch { step_index }));
        }

        self.acked[step_index as usize] = true;
        self.current_step += 1;

        if self.current_step == self.expected_steps && self.acked.iter().all(|a| *a) {
            self.state = SessionState::Completed;
            // Completion clears per-session validation bookkeeping
            self.hashes.clear();
            self.acked.clear();
            info!("session {} completed ({} steps)", self.id, self.expected_steps);
            return Ok(AckOutcome::Completed);
        }
        Ok(AckOutcome::Progressed {
            next: self.current_step,
        })
    }

    /// No acknowledgment arrived within the timeout.
    pub fn report_timeout(&mut self) -> SyncError {
        self.desync(DesyncCause::AckTimeout {
            step_index: self.current_step,
        })
    }

    /// The renderer reported a desync itself.
    pub fn report_client_desync(&mut self, cause: DesyncCause) -> SyncError {
        self.desync(cause)
    }

    fn desync(&mut self, cause: DesyncCause) -> SyncError {
        if self.accepting() {
            self.state = SessionState::Desynced;
        }
        warn!("session {}: {cause}", self.id);
        SyncError::Desync { cause }
    }

    /// Choose a recovery strategy for the current desync.
    ///
    /// Attempts are bounded by the retry ceiling (3); exceeding it aborts
    /// the session — the caller must fall back to trust-the-server-result
    /// mode and still deliver the authoritative outcome.
    pub fn begin_recovery(&mut self, cause: &DesyncCause) -> Result<RecoveryPlan, SyncError> {
        if self.state != SessionState::Desynced {
            return Err(SyncError::SessionClosed(self.id.clone()));
        }
        self.recovery_attempts += 1;
        if self.recovery_attempts > RETRY_CEILING {
            self.abort();
            return Err(SyncError::RecoveryExhausted {
                session_id: self.id.clone(),
            });
        }
        self.state = SessionState::Recovering;
        let recovery_type = RecoveryType::for_cause(cause);
        warn!(
            "session {}: recovery attempt {}/{RETRY_CEILING} via {recovery_type:?}",
            self.id, self.recovery_attempts
        );
        Ok(RecoveryPlan {
            recovery_type,
            attempt: self.recovery_attempts,
        })
    }

    /// Recovery round delivered; resume stepping at the current index.
    pub fn resume(&mut self) {
        if self.state == SessionState::Recovering {
            self.state = SessionState::Active;
        }
    }

    /// Terminate the session. No further acknowledgments are processed.
    pub fn abort(&mut self) {
        if self.state != SessionState::Completed {
            self.state = SessionState::Aborted;
            self.hashes.clear();
            self.acked.clear();
        }
    }

    /// Build the recovery payload for a plan, given the spin it serves.
    pub fn recovery_payload(&self, plan: &RecoveryPlan, spin: &SpinResult) -> RecoveryPayload {
        // The current index always addresses an undelivered step while a
        // session can desync; the final grid covers an out-of-range index.
        let grid_at_current = || {
            spin.steps
                .get(self.current_step as usize)
                .map(|step| step.grid_before.clone())
                .unwrap_or_else(|| spin.final_grid.clone())
        };
        match plan.recovery_type {
            RecoveryType::StateResync => RecoveryPayload::StateResync {
                step_index: self.current_step,
                grid: grid_at_current(),
            },
            RecoveryType::StepReplay => RecoveryPayload::StepReplay {
                step_index: self.current_step,
            },
            RecoveryType::TimingAdjustment => {
                let server_time = now_ms();
                RecoveryPayload::TimingAdjustment {
                    server_time,
                    offset_ms: server_time - self.started_at,
                }
            }
            RecoveryType::FullResync => RecoveryPayload::FullResync {
                resume_step: self.current_step,
                grid: grid_at_current(),
                feature: None,
            },
        }
    }
}
