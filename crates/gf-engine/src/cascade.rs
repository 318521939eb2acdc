//! Cascade orchestration — full spin resolution
//!
//! State machine per spin: START → DETECT → (no clusters) → END, or
//! DETECT → PAYOUT → COLLAPSE → DETECT while clusters keep forming. Each
//! loop iteration yields exactly one `CascadeStep`; the closing step with
//! no clusters is flagged terminal. The whole spin resolves synchronously
//! before any step leaves the server, so delivery never re-runs randomness.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{AccumulatorRule, GameConfig};
use crate::error::EngineError;
use crate::grid::{Cluster, Grid};
use crate::paytable::{PayTable, clamp_win, round2};
use crate::rng::SpinRng;

/// One iteration of the detect→payout→collapse loop. Immutable once
/// finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeStep {
    pub step_index: u32,
    pub grid_before: Grid,
    pub clusters: Vec<Cluster>,
    pub grid_after: Grid,
    pub step_win: f64,
    /// SHA-256 over the step content, hex-encoded
    pub validation_hash: String,
    /// True on the closing step where no further clusters exist
    pub is_terminal: bool,
}

/// Free spins feature state. Owned by the player's session-level game
/// state; the accumulator persists and grows across spins while the
/// feature is active, starts at 1 on entry, and is cleared on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeSpinsState {
    pub remaining: u32,
    pub total_win: f64,
    pub accumulator: u32,
}

impl FreeSpinsState {
    fn award(spins: u32) -> Self {
        Self {
            remaining: spins,
            total_win: 0.0,
            accumulator: 1,
        }
    }
}

/// Feature triggers and bookkeeping attached to a spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinMetadata {
    pub scatter_count: usize,
    pub scatter_win: f64,
    /// Spins awarded by this spin's scatters (0 = no trigger)
    pub free_spins_awarded: u32,
    /// Extra spins from a retrigger during the feature
    pub free_spins_retriggered: u32,
    /// Was this spin itself part of the free spins feature?
    pub is_free_spin: bool,
    /// Spins left after this one (only meaningful during the feature)
    pub free_spins_remaining: u32,
    /// Bonus multiplier event applied to the spin total, if any
    pub bonus_multiplier: Option<u32>,
}

/// Aggregate outcome of one spin. Created once per spin request; discarded
/// after delivery/acknowledgment apart from the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResult {
    pub spin_id: String,
    pub bet: f64,
    pub initial_grid: Grid,
    pub steps: Vec<CascadeStep>,
    pub final_grid: Grid,
    pub total_win: f64,
    /// Effective multiplier applied to the spin (accumulator × bonus event)
    pub total_multiplier: u32,
    pub metadata: SpinMetadata,
}

impl SpinResult {
    /// Count of non-terminal (paying-loop) steps.
    pub fn cascade_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_terminal).count()
    }
}

/// Deterministic validation hash for one cascade step.
///
/// SHA-256 over a canonical rendering of (index, grid before, grid after,
/// win). This is the single hash used on every validation surface; the
/// remote consumer recomputes it from the state it rendered.
pub fn step_hash(
    step_index: u32,
    grid_before: &Grid,
    grid_after: &Grid,
    step_win: f64,
) -> Result<String, EngineError> {
    let before = serde_json::to_string(grid_before)?;
    let after = serde_json::to_string(grid_after)?;
    let mut hasher = Sha256::new();
    hasher.update(format!("step:{step_index}|"));
    hasher.update(&before);
    hasher.update(b"|");
    hasher.update(&after);
    hasher.update(format!("|win:{step_win:.2}"));
    Ok(hex::encode(hasher.finalize()))
}

/// Cascade orchestrator. One instance per player session; the generator,
/// grid, and feature state are all owned here — nothing is shared across
/// players.
pub struct CascadeEngine {
    config: GameConfig,
    paytable: PayTable,
    rng: SpinRng,
    free_spins: Option<FreeSpinsState>,
    spin_count: u64,
}

impl CascadeEngine {
    /// Engine with a live (OS-entropy) generator.
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, SpinRng::live())
    }

    /// Engine with an injected generator — seeded for reproducible play.
    pub fn with_rng(config: GameConfig, rng: SpinRng) -> Self {
        Self {
            config,
            paytable: PayTable::standard(),
            rng,
            free_spins: None,
            spin_count: 0,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn in_free_spins(&self) -> bool {
        self.free_spins.is_some()
    }

    pub fn free_spins_state(&self) -> Option<&FreeSpinsState> {
        self.free_spins.as_ref()
    }

    /// Resolve one complete spin to exhaustion.
    pub fn spin(&mut self, bet: f64) -> Result<SpinResult, EngineError> {
        self.config.bet_limits.validate(bet)?;

        self.spin_count += 1;
        let spin_id = format!("spin-{:06}", self.spin_count);

        // Consume a free spin if the feature is active
        let is_free_spin = self.free_spins.is_some();
        if let Some(fs) = self.free_spins.as_mut() {
            fs.remaining = fs.remaining.saturating_sub(1);
        }

        let mut grid = Grid::new(self.config.cols, self.config.rows);
        grid.fill(&mut self.rng, &self.config)?;
        let initial_grid = grid.clone();

        // DETECT → PAYOUT → COLLAPSE loop
        let mut steps = Vec::new();
        let mut total_win = 0.0;
        let mut step_index = 0u32;
        loop {
            let clusters = grid.find_clusters(self.config.min_cluster_size);
            if clusters.is_empty() {
                let hash = step_hash(step_index, &grid, &grid, 0.0)?;
                steps.push(CascadeStep {
                    step_index,
                    grid_before: grid.clone(),
                    clusters,
                    grid_after: grid.clone(),
                    step_win: 0.0,
                    validation_hash: hash,
                    is_terminal: true,
                });
                break;
            }

            let accumulator = self.free_spins.as_ref().map(|fs| fs.accumulator);
            let step_win = self.paytable.total_win(
                &clusters,
                bet,
                accumulator,
                self.config.max_win_multiplier,
            );

            let grid_before = grid.clone();
            grid.remove(&clusters);
            grid.collapse_and_refill(&mut self.rng, &self.config)?;
            let grid_after = grid.clone();

            let hash = step_hash(step_index, &grid_before, &grid_after, step_win)?;
            steps.push(CascadeStep {
                step_index,
                grid_before,
                clusters,
                grid_after,
                step_win,
                validation_hash: hash,
                is_terminal: false,
            });
            total_win += step_win;

            // Accumulator growth: from the second cascade onward, each
            // cascade independently rolls a trigger chance. The roll never
            // affects the step that triggered it.
            if self.free_spins.is_some() && step_index >= 1 {
                self.roll_accumulator_growth()?;
            }
            step_index += 1;
            debug!("{spin_id}: cascade {step_index} win {step_win:.2}");
        }

        // Scatters never cluster and are never removed, so the final grid
        // holds every scatter that landed — including refill-injected ones.
        // Counted once per spin, after the loop.
        let scatter_count = grid.scatter_count();
        let scatter_win =
            self.paytable
                .scatter_win(scatter_count, bet, self.config.max_win_multiplier);
        total_win += scatter_win;

        // Free spins trigger / retrigger, evaluated once per spin
        let fs_config = &self.config.free_spins;
        let mut free_spins_awarded = 0;
        let mut free_spins_retriggered = 0;
        match self.free_spins.as_mut() {
            None => {
                if scatter_count >= fs_config.trigger_scatter_count as usize {
                    free_spins_awarded = fs_config.awarded_spins;
                    self.free_spins = Some(FreeSpinsState::award(free_spins_awarded));
                    info!("{spin_id}: {scatter_count} scatters award {free_spins_awarded} free spins");
                }
            }
            Some(fs) => {
                if scatter_count >= fs_config.retrigger_scatter_count as usize {
                    free_spins_retriggered = fs_config.retrigger_spins;
                    fs.remaining += free_spins_retriggered;
                    info!("{spin_id}: retrigger adds {free_spins_retriggered} free spins");
                }
            }
        }

        // Random bonus multiplier event: trigger probability, minimum-win
        // gate, bounded magnitude from the weighted table.
        let bonus_config = &self.config.bonus_multiplier;
        let mut bonus_multiplier = None;
        if total_win >= bet * bonus_config.min_win_multiple
            && total_win > 0.0
            && self.rng.chance(bonus_config.trigger_chance)
        {
            let mult = self.rng.weighted_pick(&bonus_config.multipliers)?;
            bonus_multiplier = Some(mult);
            total_win = round2(total_win * mult as f64);
            info!("{spin_id}: bonus multiplier x{mult}");
        }

        total_win = clamp_win(round2(total_win), bet, self.config.max_win_multiplier);

        // Close out feature bookkeeping; the accumulator is cleared with
        // the feature when the last spin finishes.
        let accumulator_at_end = self
            .free_spins
            .as_ref()
            .map(|fs| fs.accumulator)
            .unwrap_or(1);
        let mut free_spins_remaining = 0;
        if let Some(fs) = self.free_spins.as_mut() {
            fs.total_win = round2(fs.total_win + total_win);
            free_spins_remaining = fs.remaining;
            if is_free_spin && fs.remaining == 0 {
                info!("{spin_id}: free spins feature complete, {:.2} total", fs.total_win);
                self.free_spins = None;
            }
        }

        let total_multiplier = accumulator_at_end * bonus_multiplier.unwrap_or(1);

        Ok(SpinResult {
            spin_id,
            bet,
            initial_grid,
            final_grid: grid,
            total_win,
            total_multiplier,
            metadata: SpinMetadata {
                scatter_count,
                scatter_win,
                free_spins_awarded,
                free_spins_retriggered,
                is_free_spin,
                free_spins_remaining,
                bonus_multiplier,
            },
            steps,
        })
    }

    fn roll_accumulator_growth(&mut self) -> Result<(), EngineError> {
        let fs_config = self.config.free_spins.clone();
        if !self.rng.chance(fs_config.accumulator_trigger_chance) {
            return Ok(());
        }
        let added = self.rng.weighted_pick(&fs_config.accumulator_multipliers)?;
        if let Some(fs) = self.free_spins.as_mut() {
            fs.accumulator = match fs_config.accumulator_rule {
                AccumulatorRule::Additive => fs.accumulator + added,
                AccumulatorRule::Multiplicative => fs.accumulator.saturating_mul(added),
            };
            debug!("accumulator now x{}", fs.accumulator);
        }
        Ok(())
    }
}
