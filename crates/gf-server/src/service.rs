//! Spin service — per-connection game loop and session delivery

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};
use uuid::Uuid;

use gf_engine::{CascadeEngine, EngineError, GameConfig, SpinResult, SpinRng};
use gf_sync::delivery::{DeliveryConfig, SessionDriver, StepTransport};
use gf_sync::protocol::GameMessage;
use gf_sync::{AuditLog, SyncError};

/// Tracks which players have a spin in flight. A new spin request while
/// one is active is rejected, never queued silently.
#[derive(Clone, Default)]
pub struct ActiveSpins {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl ActiveSpins {
    /// Claim the player's spin slot; the guard releases it on drop.
    pub fn begin(&self, player_id: &str) -> Option<SpinGuard> {
        let mut active = self.inner.lock();
        if !active.insert(player_id.to_string()) {
            return None;
        }
        Some(SpinGuard {
            registry: self.clone(),
            player_id: player_id.to_string(),
        })
    }

    pub fn is_active(&self, player_id: &str) -> bool {
        self.inner.lock().contains(player_id)
    }
}

pub struct SpinGuard {
    registry: ActiveSpins,
    player_id: String,
}

impl Drop for SpinGuard {
    fn drop(&mut self) {
        self.registry.inner.lock().remove(&self.player_id);
    }
}

/// WebSocket framing for `GameMessage`s.
pub struct WsTransport {
    ws: WebSocketStream<TcpStream>,
}

impl WsTransport {
    pub async fn send_msg(&mut self, msg: &GameMessage) -> Result<(), SyncError> {
        let text = serde_json::to_string(msg)?;
        self.ws
            .send(Message::text(text))
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))
    }

    pub async fn recv_msg(&mut self) -> Result<GameMessage, SyncError> {
        while let Some(frame) = self.ws.next().await {
            let frame = frame.map_err(|e| SyncError::Transport(e.to_string()))?;
            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => {
                    return Err(SyncError::Transport("connection closed".into()));
                }
                _ => continue,
            }
        }
        Err(SyncError::Transport("connection closed".into()))
    }
}

impl StepTransport for &mut WsTransport {
    async fn send(&mut self, msg: &GameMessage) -> Result<(), SyncError> {
        self.send_msg(msg).await
    }

    async fn recv(&mut self) -> Result<GameMessage, SyncError> {
        self.recv_msg().await
    }
}

/// Shared service state. Game state itself (engine, generator, feature
/// progress) lives per connection, never here.
#[derive(Clone)]
pub struct SpinService {
    config: GameConfig,
    seed: Option<String>,
    audit: Arc<AuditLog>,
    active: ActiveSpins,
}

impl SpinService {
    pub fn new(config: GameConfig, seed: Option<String>, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            seed,
            audit,
            active: ActiveSpins::default(),
        }
    }

    /// Synchronous fallback for transports without persistent
    /// connections: one request, the full authoritative result, no
    /// step-by-step delivery.
    pub fn full_result_message(spin: &SpinResult) -> GameMessage {
        GameMessage::SpinComplete {
            session_id: spin.spin_id.clone(),
            final_grid: spin.final_grid.clone(),
            total_win: spin.total_win,
            total_multiplier: spin.total_multiplier,
            metadata: spin.metadata.clone(),
        }
    }

    fn build_engine(&self) -> Result<CascadeEngine, EngineError> {
        match &self.seed {
            Some(seed) => Ok(CascadeEngine::with_rng(
                self.config.clone(),
                SpinRng::seeded(seed)?,
            )),
            None => Ok(CascadeEngine::new(self.config.clone())),
        }
    }

    pub async fn handle_connection(&self, stream: TcpStream) -> Result<(), SyncError> {
        let ws = accept_async(stream)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let mut transport = WsTransport { ws };
        let player_id = Uuid::new_v4().to_string();
        let mut engine = self.build_engine()?;

        loop {
            let msg = match transport.recv_msg().await {
                Ok(msg) => msg,
                Err(SyncError::Serialize(err)) => {
                    warn!("player {player_id}: malformed message: {err}");
                    transport
                        .send_msg(&GameMessage::Error {
                            code: "malformed_request".into(),
                            message: err.to_string(),
                        })
                        .await?;
                    continue;
                }
                Err(SyncError::Transport(_)) => {
                    info!("player {player_id} disconnected");
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            match msg {
                GameMessage::SpinRequest {
                    bet_amount,
                    quick_spin_mode,
                } => {
                    let Some(_guard) = self.active.begin(&player_id) else {
                        transport
                            .send_msg(&GameMessage::Error {
                                code: "spin_in_flight".into(),
                                message: "a spin is already active for this session".into(),
                            })
                            .await?;
                        continue;
                    };

                    let spin = match engine.spin(bet_amount) {
                        Ok(spin) => spin,
                        Err(EngineError::Validation(message)) => {
                            transport
                                .send_msg(&GameMessage::Error {
                                    code: "invalid_bet".into(),
                                    message,
                                })
                                .await?;
                            continue;
                        }
                        Err(err) => {
                            // Generator failures are fatal for the request
                            transport
                                .send_msg(&GameMessage::Error {
                                    code: "engine_failure".into(),
                                    message: err.to_string(),
                                })
                                .await?;
                            return Err(err.into());
                        }
                    };
                    info!(
                        "player {player_id}: {} bet {bet_amount:.2} win {:.2} ({} steps, quick={quick_spin_mode})",
                        spin.spin_id,
                        spin.total_win,
                        spin.steps.len()
                    );

                    let mut driver =
                        SessionDriver::new(&mut transport, DeliveryConfig::default());
                    match driver.run(&spin).await {
                        Ok(outcome) => {
                            info!("player {player_id}: {} delivered ({outcome:?})", spin.spin_id);
                            self.audit.append(&spin)?;
                        }
                        Err(SyncError::Transport(err)) => {
                            // Channel died mid-delivery; the outcome is
                            // preserved in the audit log for replay.
                            warn!("player {player_id}: transport lost mid-spin: {err}");
                            self.audit.append(&spin)?;
                            return Ok(());
                        }
                        Err(err) => return Err(err),
                    }
                }
                other => {
                    warn!(
                        "player {player_id}: unexpected {} outside a session",
                        other.type_name()
                    );
                    transport
                        .send_msg(&GameMessage::Error {
                            code: "unexpected_message".into(),
                            message: format!("{} not valid here", other.type_name()),
                        })
                        .await?;
                }
            }
        }
    }
}
