//! Game configuration

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::symbols::{SymbolKind, default_weights};

/// Bet validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetLimits {
    /// Minimum accepted bet
    pub min_bet: f64,
    /// Maximum accepted bet
    pub max_bet: f64,
    /// Explicit allowed bet levels; empty = any value within min/max
    pub allowed_levels: Vec<f64>,
}

impl BetLimits {
    /// Validate a requested bet amount.
    pub fn validate(&self, bet: f64) -> Result<(), EngineError> {
        if !bet.is_finite() || bet < self.min_bet || bet > self.max_bet {
            return Err(EngineError::Validation(format!(
                "bet {bet} outside limits [{}, {}]",
                self.min_bet, self.max_bet
            )));
        }
        if !self.allowed_levels.is_empty()
            && !self
                .allowed_levels
                .iter()
                .any(|level| (level - bet).abs() < 1e-9)
        {
            return Err(EngineError::Validation(format!(
                "bet {bet} is not an allowed level"
            )));
        }
        Ok(())
    }
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min_bet: 0.20,
            max_bet: 100.0,
            allowed_levels: vec![0.20, 0.50, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0],
        }
    }
}

/// How accumulator multiplier events combine during free spins.
///
/// Additive is the default: each triggered multiplier is added to the
/// running accumulator. Multiplicative compounds instead, which materially
/// raises feature volatility and RTP contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorRule {
    Additive,
    Multiplicative,
}

/// Free spins feature parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSpinsConfig {
    /// Scatters needed to trigger the feature
    pub trigger_scatter_count: u8,
    /// Spins awarded on trigger
    pub awarded_spins: u32,
    /// Scatters needed to retrigger during the feature
    pub retrigger_scatter_count: u8,
    /// Extra spins on retrigger
    pub retrigger_spins: u32,
    /// Per-cascade chance (second cascade onward) to grow the accumulator
    pub accumulator_trigger_chance: f64,
    /// Weighted multipliers added to the accumulator on trigger
    pub accumulator_multipliers: Vec<(u32, u32)>,
    /// How accumulator events combine
    pub accumulator_rule: AccumulatorRule,
}

impl Default for FreeSpinsConfig {
    fn default() -> Self {
        Self {
            trigger_scatter_count: 4,
            awarded_spins: 10,
            retrigger_scatter_count: 3,
            retrigger_spins: 5,
            accumulator_trigger_chance: 0.30,
            accumulator_multipliers: vec![(2, 50), (3, 25), (5, 15), (10, 8), (25, 2)],
            accumulator_rule: AccumulatorRule::Additive,
        }
    }
}

/// Post-spin random bonus multiplier event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusMultiplierConfig {
    /// Independent trigger probability per spin
    pub trigger_chance: f64,
    /// Spin total must reach this many bets to qualify
    pub min_win_multiple: f64,
    /// Weighted bonus multipliers
    pub multipliers: Vec<(u32, u32)>,
}

impl Default for BonusMultiplierConfig {
    fn default() -> Self {
        Self {
            trigger_chance: 0.02,
            min_win_multiple: 0.5,
            multipliers: vec![(2, 60), (3, 25), (5, 10), (10, 5)],
        }
    }
}

/// Complete engine configuration. Serializable so deployments can tune RTP
/// without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Grid columns
    pub cols: usize,
    /// Grid rows
    pub rows: usize,
    /// Minimum cluster size that pays
    pub min_cluster_size: usize,
    /// Symbol generation weights
    pub symbol_weights: Vec<(SymbolKind, u32)>,
    /// Independent per-cell scatter injection chance
    pub scatter_chance: f64,
    /// Chance that a generated symbol carries a random multiplier
    pub symbol_multiplier_chance: f64,
    /// Weighted multipliers attached to symbols when the roll succeeds
    pub symbol_multipliers: Vec<(u32, u32)>,
    /// Bet validation
    pub bet_limits: BetLimits,
    /// Win cap as a multiple of bet
    pub max_win_multiplier: f64,
    /// Free spins feature
    pub free_spins: FreeSpinsConfig,
    /// Post-spin bonus multiplier event
    pub bonus_multiplier: BonusMultiplierConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 6,
            rows: 5,
            min_cluster_size: 8,
            symbol_weights: default_weights(),
            scatter_chance: 0.02,
            symbol_multiplier_chance: 0.04,
            symbol_multipliers: vec![(2, 50), (3, 24), (5, 14), (10, 8), (25, 3), (50, 1)],
            bet_limits: BetLimits::default(),
            max_win_multiplier: 5000.0,
            free_spins: FreeSpinsConfig::default(),
            bonus_multiplier: BonusMultiplierConfig::default(),
        }
    }
}

impl GameConfig {
    /// Export as pretty JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_limits_validate() {
        let limits = BetLimits::default();
        assert!(limits.validate(1.0).is_ok());
        assert!(limits.validate(0.05).is_err());
        assert!(limits.validate(1000.0).is_err());
        assert!(limits.validate(1.37).is_err()); // not an allowed level
        assert!(limits.validate(f64::NAN).is_err());
    }

    #[test]
    fn test_free_levels_when_list_empty() {
        let limits = BetLimits {
            allowed_levels: Vec::new(),
            ..BetLimits::default()
        };
        assert!(limits.validate(1.37).is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = GameConfig::default();
        let json = config.to_json().unwrap();
        let restored = GameConfig::from_json(&json).unwrap();
        assert_eq!(restored.cols, 6);
        assert_eq!(restored.rows, 5);
        assert_eq!(restored.min_cluster_size, 8);
        assert_eq!(
            restored.free_spins.accumulator_rule,
            AccumulatorRule::Additive
        );
    }
}
