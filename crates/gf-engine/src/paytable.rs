//! Tiered payout calculation
//!
//! Cluster pays use size tiers (8–9, 10–11, 12+); scatters use exact-count
//! tiers (4, 5, 6+). Both feed the same base formula:
//! `win = (bet / 20) * tier_multiplier`, scaled by the highest per-symbol
//! multiplier in the cluster, rounded to currency precision, and clamped to
//! the configured maximum win multiple of bet.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::grid::Cluster;
use crate::symbols::SymbolKind;

/// One symbol's tier multipliers: 8–9 / 10–11 / 12+ cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PayTiers {
    pub tier_8: f64,
    pub tier_10: f64,
    pub tier_12: f64,
}

impl PayTiers {
    const fn new(tier_8: f64, tier_10: f64, tier_12: f64) -> Self {
        Self {
            tier_8,
            tier_10,
            tier_12,
        }
    }

    /// Multiplier for a cluster size, 0 below the paying minimum.
    pub fn for_size(&self, size: usize) -> f64 {
        match size {
            0..=7 => 0.0,
            8..=9 => self.tier_8,
            10..=11 => self.tier_10,
            _ => self.tier_12,
        }
    }
}

/// Scatter exact-count tiers. Values chosen so 4/5/6+ scatters pay
/// 3×/5×/100× bet through the shared `(bet / 20)` base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScatterTiers {
    pub count_4: f64,
    pub count_5: f64,
    pub count_6_plus: f64,
}

impl ScatterTiers {
    pub fn for_count(&self, count: usize) -> f64 {
        match count {
            0..=3 => 0.0,
            4 => self.count_4,
            5 => self.count_5,
            _ => self.count_6_plus,
        }
    }
}

/// Complete paytable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayTable {
    entries: Vec<(SymbolKind, PayTiers)>,
    pub scatter: ScatterTiers,
}

impl PayTable {
    /// Standard GemFall paytable.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                (SymbolKind::Amber, PayTiers::new(0.5, 1.2, 5.0)),
                (SymbolKind::Topaz, PayTiers::new(0.8, 1.8, 8.0)),
                (SymbolKind::Emerald, PayTiers::new(1.0, 2.0, 10.0)),
                (SymbolKind::Sapphire, PayTiers::new(1.5, 3.0, 12.0)),
                (SymbolKind::Amethyst, PayTiers::new(2.0, 5.0, 15.0)),
                (SymbolKind::Ruby, PayTiers::new(3.0, 8.0, 20.0)),
                (SymbolKind::Chronometer, PayTiers::new(4.0, 12.0, 24.0)),
                (SymbolKind::Hourglass, PayTiers::new(6.0, 20.0, 30.0)),
                (SymbolKind::TimeGem, PayTiers::new(10.0, 25.0, 40.0)),
            ],
            scatter: ScatterTiers {
                count_4: 60.0,
                count_5: 100.0,
                count_6_plus: 2000.0,
            },
        }
    }

    /// Tier lookup for a kind. A kind absent from the table pays zero, not
    /// an error.
    pub fn tiers(&self, kind: SymbolKind) -> Option<PayTiers> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, tiers)| *tiers)
    }

    /// Win for one cluster at a given bet.
    pub fn cluster_win(&self, cluster: &Cluster, bet: f64, max_win_multiplier: f64) -> f64 {
        let Some(tiers) = self.tiers(cluster.kind) else {
            return 0.0;
        };
        let tier_mult = tiers.for_size(cluster.size());
        if tier_mult <= 0.0 {
            return 0.0;
        }
        let base = (bet / 20.0) * tier_mult * cluster.highest_multiplier as f64;
        clamp_win(round2(base), bet, max_win_multiplier)
    }

    /// Win for one cascade step: sum of cluster wins, then multiplied by
    /// the free-spins accumulator when the feature is active.
    pub fn total_win(
        &self,
        clusters: &[Cluster],
        bet: f64,
        accumulator: Option<u32>,
        max_win_multiplier: f64,
    ) -> f64 {
        let sum: f64 = clusters
            .iter()
            .map(|c| self.cluster_win(c, bet, max_win_multiplier))
            .sum();
        let total = match accumulator {
            Some(acc) => sum * acc as f64,
            None => sum,
        };
        clamp_win(round2(total), bet, max_win_multiplier)
    }

    /// Scatter pay for a count anywhere on the grid.
    pub fn scatter_win(&self, count: usize, bet: f64, max_win_multiplier: f64) -> f64 {
        let tier_mult = self.scatter.for_count(count);
        if tier_mult <= 0.0 {
            return 0.0;
        }
        clamp_win(round2((bet / 20.0) * tier_mult), bet, max_win_multiplier)
    }
}

impl Default for PayTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Round to currency precision (2 decimals).
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Cap a win at `bet * max_win_multiplier`. Overflow is capped and logged,
/// never rejected — the player's outcome is preserved.
pub fn clamp_win(amount: f64, bet: f64, max_win_multiplier: f64) -> f64 {
    let cap = round2(bet * max_win_multiplier);
    if amount > cap {
        warn!("win {amount:.2} exceeds cap {cap:.2}, clamping");
        cap
    } else {
        amount
    }
}
