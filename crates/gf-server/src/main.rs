//! GemFall delivery server
//!
//! Accepts renderer connections over WebSocket, resolves spins on the
//! authoritative engine, and streams cascade steps with per-step hash
//! validation. One engine and one generator per connection — no game
//! state is shared across players.

mod service;

use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use gf_engine::GameConfig;
use gf_sync::AuditLog;

use crate::service::SpinService;

#[derive(Debug, Parser)]
#[command(name = "gf-server", about = "GemFall spin delivery server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8765")]
    bind: String,

    /// Game config JSON file (defaults to the built-in configuration)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Deterministic generator seed — reproducible sessions for testing
    /// and audit replay. Live play runs unseeded.
    #[arg(long)]
    seed: Option<String>,

    /// Append-only spin history file
    #[arg(long, default_value = "gemfall-audit.jsonl")]
    audit_log: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GameConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        info!("running with a deterministic seed — not for live play");
    }

    let service = SpinService::new(config, args.seed.clone(), Arc::new(AuditLog::new(args.audit_log)));

    let listener = TcpListener::bind(&args.bind).await?;
    info!("listening on {}", args.bind);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!("connection from {peer}");
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(err) = service.handle_connection(stream).await {
                        error!("connection {peer} ended with error: {err}");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}
