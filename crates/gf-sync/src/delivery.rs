//! Async step delivery driver
//!
//! Sits on top of the pure session state machine and an abstract transport.
//! Steps go out strictly in order; the driver awaits one acknowledgment per
//! step with a bounded timeout, feeds every outcome into the session, and
//! emits recovery data when the session desyncs. Transport sends are
//! retried with backoff; when the session aborts (recovery ceiling) the
//! authoritative result is still pushed so the player's outcome is never
//! lost.

use std::time::Duration;

use log::{info, warn};
use tokio::time::{Instant, sleep, timeout_at};

use gf_engine::cascade::{CascadeStep, SpinResult};

use crate::error::SyncError;
use crate::protocol::{GameMessage, now_ms};
use crate::session::{AckOutcome, SessionState, SyncSession};

/// Abstract bidirectional message channel to the renderer.
#[allow(async_fn_in_trait)]
pub trait StepTransport {
    async fn send(&mut self, msg: &GameMessage) -> Result<(), SyncError>;
    async fn recv(&mut self) -> Result<GameMessage, SyncError>;
}

/// Delivery tuning.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// How long to wait for each step's acknowledgment
    pub ack_timeout: Duration,
    /// Transport send retries before giving up on the channel
    pub send_retries: u32,
    /// Base backoff between send retries
    pub retry_backoff: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(5),
            send_retries: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// How a delivery run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every step acknowledged; renderer is in sync
    Completed,
    /// Session aborted; the final result was pushed without step-by-step
    /// animation (trust-the-server-result mode)
    Downgraded { reason: String },
}

/// Drives one session over a transport.
pub struct SessionDriver<T: StepTransport> {
    transport: T,
    config: DeliveryConfig,
}

impl<T: StepTransport> SessionDriver<T> {
    pub fn new(transport: T, config: DeliveryConfig) -> Self {
        Self { transport, config }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Deliver a resolved spin step-by-step, then the terminal
    /// `spin_complete`. Transport-level failure is an error — the caller
    /// owns the synchronous full-result fallback for dead channels.
    pub async fn run(&mut self, spin: &SpinResult) -> Result<DeliveryOutcome, SyncError> {
        let mut session = SyncSession::open(spin);
        let start = session.start();
        self.send_with_retry(&start).await?;
        info!(
            "session {}: delivering {} steps for {}",
            session.id(),
            session.expected_steps(),
            spin.spin_id
        );

        let mut downgrade_reason = None;
        while session.state() == SessionState::Active {
            let step = &spin.steps[session.current_step() as usize];
            let msg = step_message(session.id(), step);
            self.send_with_retry(&msg).await?;

            if let Err(err) = self.await_ack(&mut session).await {
                match err {
                    SyncError::Desync { cause } => {
                        match session.begin_recovery(&cause) {
                            Ok(plan) => {
                                let payload = session.recovery_payload(&plan, spin);
                                let recovery = GameMessage::RecoveryData {
                                    session_id: session.id().to_string(),
                                    payload,
                                };
                                self.send_with_retry(&recovery).await?;
                                session.resume();
                            }
                            Err(SyncError::RecoveryExhausted { session_id }) => {
                                warn!("session {session_id}: downgrading to full-result mode");
                                downgrade_reason = Some("recovery ceiling exceeded".to_string());
                                break;
                            }
                            Err(other) => return Err(other),
                        }
                    }
                    other => return Err(other),
                }
            }
        }

        // The authoritative outcome always goes out, synchronized or not.
        let complete = GameMessage::SpinComplete {
            session_id: session.id().to_string(),
            final_grid: spin.final_grid.clone(),
            total_win: spin.total_win,
            total_multiplier: spin.total_multiplier,
            metadata: spin.metadata.clone(),
        };
        self.send_with_retry(&complete).await?;

        match downgrade_reason {
            None => Ok(DeliveryOutcome::Completed),
            Some(reason) => Ok(DeliveryOutcome::Downgraded { reason }),
        }
    }

    /// Wait for the current step's acknowledgment and apply it.
    ///
    /// One fixed deadline per step: unrelated inbound traffic is answered
    /// or ignored but never extends the acknowledgment window.
    async fn await_ack(&mut self, session: &mut SyncSession) -> Result<(), SyncError> {
        let deadline = Instant::now() + self.config.ack_timeout;
        loop {
            let received = match timeout_at(deadline, self.transport.recv()).await {
                Err(_elapsed) => return Err(session.report_timeout()),
                Ok(Err(transport_err)) => return Err(transport_err),
                Ok(Ok(msg)) => msg,
            };
            match received {
                GameMessage::StepAcknowledgment {
                    session_id,
                    step_index,
                    recomputed_hash,
                    ..
                } => {
                    return match session.handle_ack(&session_id, step_index, &recomputed_hash) {
                        Ok(AckOutcome::Progressed { .. }) | Ok(AckOutcome::Completed) => Ok(()),
                        Err(err) => Err(err),
                    };
                }
                GameMessage::DesyncDetected { cause, .. } => {
                    return Err(session.report_client_desync(cause));
                }
                GameMessage::SpinRequest { .. } => {
                    // Only one spin per player may be in flight; a request
                    // during delivery is rejected, never queued.
                    warn!(
                        "session {}: rejecting spin_request during delivery",
                        session.id()
                    );
                    self.transport
                        .send(&GameMessage::Error {
                            code: "spin_in_flight".to_string(),
                            message: "a spin is already being delivered".to_string(),
                        })
                        .await?;
                }
                other => {
                    // Not part of the ack protocol; the deadline keeps
                    // running.
                    warn!(
                        "session {}: ignoring unexpected {} message",
                        session.id(),
                        other.type_name()
                    );
                }
            }
        }
    }

    async fn send_with_retry(&mut self, msg: &GameMessage) -> Result<(), SyncError> {
        let mut attempt = 0u32;
        loop {
            match self.transport.send(msg).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.config.send_retries => {
                    attempt += 1;
                    warn!(
                        "send {} failed (attempt {attempt}/{}): {err}",
                        msg.type_name(),
                        self.config.send_retries
                    );
                    sleep(self.config.retry_backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Wire message for one cascade step.
pub fn step_message(session_id: &str, step: &CascadeStep) -> GameMessage {
    GameMessage::CascadeStep {
        session_id: session_id.to_string(),
        step_index: step.step_index,
        grid_before: step.grid_before.clone(),
        grid_after: step.grid_after.clone(),
        clusters: step.clusters.clone(),
        step_win: step.step_win,
        validation_hash: step.validation_hash.clone(),
        timestamp: now_ms(),
    }
}
