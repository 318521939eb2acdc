//! GemFall Cluster Engine
//!
//! Authoritative simulation core for the GemFall cascading slot:
//! - Seeded/live random generation (`rng`)
//! - Symbol grid with cluster detection and gravity collapse (`grid`)
//! - Tiered cluster payouts with win capping (`paytable`)
//! - Full spin resolution — cascade loop, free spins, bonus multipliers (`cascade`)
//!
//! Everything in this crate is synchronous and deterministic: a spin is
//! resolved to completion before any step leaves the server, so replaying a
//! seed always reproduces the exact step sequence.

pub mod cascade;
pub mod config;
pub mod error;
pub mod grid;
pub mod paytable;
pub mod rng;
pub mod symbols;

pub use cascade::{CascadeEngine, CascadeStep, FreeSpinsState, SpinMetadata, SpinResult};
pub use config::{AccumulatorRule, BetLimits, GameConfig};
pub use error::EngineError;
pub use grid::{Cluster, Grid};
pub use paytable::PayTable;
pub use rng::SpinRng;
pub use symbols::{Symbol, SymbolKind};
