//! Symbol definitions
//!
//! The GemFall symbol set is closed: six low-paying gems, three high-paying
//! time pieces, and the scatter. Wire names are snake_case (`time_gem`,
//! `scatter`, ...) to match the renderer's asset keys.

use serde::{Deserialize, Serialize};

/// Symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    // Low paying gems
    Amber,
    Topaz,
    Emerald,
    Sapphire,
    Amethyst,
    Ruby,
    // High paying time pieces
    Chronometer,
    Hourglass,
    TimeGem,
    // Triggers free spins by count, pays by exact count
    Scatter,
}

impl SymbolKind {
    /// All paying (non-scatter) kinds, low tier first.
    pub const PAYING: [SymbolKind; 9] = [
        SymbolKind::Amber,
        SymbolKind::Topaz,
        SymbolKind::Emerald,
        SymbolKind::Sapphire,
        SymbolKind::Amethyst,
        SymbolKind::Ruby,
        SymbolKind::Chronometer,
        SymbolKind::Hourglass,
        SymbolKind::TimeGem,
    ];

    /// Is this one of the three high symbols?
    pub fn is_high(&self) -> bool {
        matches!(
            self,
            SymbolKind::Chronometer | SymbolKind::Hourglass | SymbolKind::TimeGem
        )
    }

    pub fn is_scatter(&self) -> bool {
        matches!(self, SymbolKind::Scatter)
    }
}

/// A placed symbol: a kind plus the multiplier it landed with.
///
/// Immutable once placed — cascades replace cells, they never mutate them.
/// The multiplier defaults to 1 and is only raised by the random-multiplier
/// feature at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_multiplier() -> u32 {
    1
}

impl Symbol {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            multiplier: 1,
        }
    }

    pub fn with_multiplier(kind: SymbolKind, multiplier: u32) -> Self {
        Self {
            kind,
            multiplier: multiplier.max(1),
        }
    }
}

/// Default generation weights, tuned for the target RTP.
///
/// Lows dominate the reel; highs are roughly one order rarer. Scatter is
/// injected separately (see `GameConfig::scatter_chance`) and carries no
/// weight here.
pub fn default_weights() -> Vec<(SymbolKind, u32)> {
    vec![
        (SymbolKind::Amber, 180),
        (SymbolKind::Topaz, 170),
        (SymbolKind::Emerald, 160),
        (SymbolKind::Sapphire, 150),
        (SymbolKind::Amethyst, 140),
        (SymbolKind::Ruby, 130),
        (SymbolKind::Chronometer, 45),
        (SymbolKind::Hourglass, 30),
        (SymbolKind::TimeGem, 20),
    ]
}
