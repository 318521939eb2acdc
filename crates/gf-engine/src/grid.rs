//! Symbol grid — cluster detection, removal, gravity collapse
//!
//! The grid is owned exclusively by the engine for the duration of a spin.
//! Cells are only transiently empty between `remove` and
//! `collapse_and_refill`; every public snapshot of the grid is full.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::rng::SpinRng;
use crate::symbols::{Symbol, SymbolKind};

/// A maximal 4-connected group of same-kind cells.
///
/// Computed fresh each cascade iteration; never persisted across
/// iterations. Cells are listed in discovery order, positions as
/// `(col, row)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub kind: SymbolKind,
    pub cells: Vec<(usize, usize)>,
    /// Highest per-symbol multiplier among the matched cells
    pub highest_multiplier: u32,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.cells.len()
    }
}

/// Fixed-size symbol grid, columns of rows, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<Option<Symbol>>>,
}

impl Grid {
    /// Allocate an empty grid.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![vec![None; rows]; cols],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Symbol at `(col, row)`, if the cell is occupied.
    pub fn get(&self, col: usize, row: usize) -> Option<Symbol> {
        self.cells.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    /// Place a symbol. Used by `fill`/refill and by tests building fixed
    /// layouts.
    pub fn set(&mut self, col: usize, row: usize, symbol: Symbol) {
        if col < self.cols && row < self.rows {
            self.cells[col][row] = Some(symbol);
        }
    }

    /// Every cell occupied?
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .all(|column| column.iter().all(|cell| cell.is_some()))
    }

    /// Count scatters anywhere on the grid (adjacency-independent).
    pub fn scatter_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_some_and(|s| s.kind.is_scatter()))
            .count()
    }

    /// Populate every empty cell: independent scatter-injection roll first,
    /// otherwise a weighted symbol pick with an optional attached
    /// multiplier. `fill` and refill go through this same path so their
    /// distributions are identical.
    pub fn fill(&mut self, rng: &mut SpinRng, config: &GameConfig) -> Result<(), EngineError> {
        for col in 0..self.cols {
            for row in 0..self.rows {
                if self.cells[col][row].is_none() {
                    self.cells[col][row] = Some(roll_symbol(rng, config)?);
                }
            }
        }
        Ok(())
    }

    /// Connected-component scan over the grid.
    ///
    /// 4-directional adjacency, each cell visited at most once. Clusters
    /// below `min_cluster_size` are discarded. Returned in row-major order
    /// of each cluster's first-discovered cell so payout attribution and
    /// hashing are reproducible. Scatters never cluster.
    pub fn find_clusters(&self, min_cluster_size: usize) -> Vec<Cluster> {
        let mut visited = vec![vec![false; self.rows]; self.cols];
        let mut clusters = Vec::new();

        for row in 0..self.rows {
            for col in 0..self.cols {
                if visited[col][row] {
                    continue;
                }
                let Some(symbol) = self.cells[col][row] else {
                    continue;
                };
                if symbol.kind.is_scatter() {
                    visited[col][row] = true;
                    continue;
                }

                // Flood fill from (col, row)
                let kind = symbol.kind;
                let mut cells = Vec::new();
                let mut highest_multiplier = 1u32;
                let mut stack = vec![(col, row)];
                visited[col][row] = true;

                while let Some((c, r)) = stack.pop() {
                    let cell = self.cells[c][r].unwrap_or(symbol);
                    highest_multiplier = highest_multiplier.max(cell.multiplier);
                    cells.push((c, r));

                    let neighbors = [
                        (c.wrapping_sub(1), r),
                        (c + 1, r),
                        (c, r.wrapping_sub(1)),
                        (c, r + 1),
                    ];
                    for (nc, nr) in neighbors {
                        if nc < self.cols
                            && nr < self.rows
                            && !visited[nc][nr]
                            && self.cells[nc][nr].is_some_and(|s| s.kind == kind)
                        {
                            visited[nc][nr] = true;
                            stack.push((nc, nr));
                        }
                    }
                }

                if cells.len() >= min_cluster_size {
                    clusters.push(Cluster {
                        kind,
                        cells,
                        highest_multiplier,
                    });
                }
            }
        }

        clusters
    }

    /// Mark every matched cell empty.
    pub fn remove(&mut self, clusters: &[Cluster]) {
        for cluster in clusters {
            for &(col, row) in &cluster.cells {
                if col < self.cols && row < self.rows {
                    self.cells[col][row] = None;
                }
            }
        }
    }

    /// Gravity collapse plus refill, one atomic pass per column.
    ///
    /// Symbols above empty cells fall to fill gaps from the bottom,
    /// preserving relative order; exposed cells at the top are refilled via
    /// the same weighted selection as `fill`. Afterwards no cell is empty.
    pub fn collapse_and_refill(
        &mut self,
        rng: &mut SpinRng,
        config: &GameConfig,
    ) -> Result<(), EngineError> {
        for col in 0..self.cols {
            let survivors: Vec<Symbol> = self.cells[col].iter().filter_map(|c| *c).collect();
            let gap = self.rows - survivors.len();

            let mut column = Vec::with_capacity(self.rows);
            for _ in 0..gap {
                column.push(Some(roll_symbol(rng, config)?));
            }
            column.extend(survivors.into_iter().map(Some));
            self.cells[col] = column;
        }
        Ok(())
    }
}

fn roll_symbol(rng: &mut SpinRng, config: &GameConfig) -> Result<Symbol, EngineError> {
    if rng.chance(config.scatter_chance) {
        return Ok(Symbol::new(SymbolKind::Scatter));
    }
    let kind = rng.weighted_pick(&config.symbol_weights)?;
    if config.symbol_multiplier_chance > 0.0 && rng.chance(config.symbol_multiplier_chance) {
        let multiplier = rng.weighted_pick(&config.symbol_multipliers)?;
        return Ok(Symbol::with_multiplier(kind, multiplier));
    }
    Ok(Symbol::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_grid_of(kind: SymbolKind, cols: usize, rows: usize) -> Grid {
        let mut grid = Grid::new(cols, rows);
        for col in 0..cols {
            for row in 0..rows {
                grid.set(col, row, Symbol::new(kind));
            }
        }
        grid
    }

    #[test]
    fn test_fill_leaves_no_empty_cells() {
        let config = GameConfig::default();
        let mut rng = SpinRng::seeded("fill").unwrap();
        let mut grid = Grid::new(config.cols, config.rows);
        grid.fill(&mut rng, &config).unwrap();
        assert!(grid.is_full());
    }

    #[test]
    fn test_single_cluster_covers_full_grid() {
        let grid = full_grid_of(SymbolKind::Ruby, 6, 5);
        let clusters = grid.find_clusters(8);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size(), 30);
        assert_eq!(clusters[0].kind, SymbolKind::Ruby);
    }

    #[test]
    fn test_clusters_below_minimum_discarded() {
        let mut grid = full_grid_of(SymbolKind::Ruby, 6, 5);
        // Carve a 7-cell emerald block into the top-left corner
        for (col, row) in [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (0, 2), (1, 2)] {
            grid.set(col, row, Symbol::new(SymbolKind::Emerald));
        }
        let clusters = grid.find_clusters(8);
        assert!(clusters.iter().all(|c| c.kind == SymbolKind::Ruby));
        assert!(clusters.iter().all(|c| c.size() >= 8));
    }

    #[test]
    fn test_diagonal_cells_do_not_connect() {
        let mut grid = full_grid_of(SymbolKind::Ruby, 6, 5);
        // Checkerboard emeralds: never 4-adjacent to each other
        for col in 0..6 {
            for row in 0..5 {
                if (col + row) % 2 == 0 {
                    grid.set(col, row, Symbol::new(SymbolKind::Emerald));
                }
            }
        }
        assert!(grid.find_clusters(8).is_empty());
    }

    #[test]
    fn test_cluster_order_row_major_by_first_cell() {
        let mut grid = Grid::new(6, 5);
        // Left 3 columns sapphire (15 cells), right 3 columns topaz (15 cells)
        for col in 0..6 {
            for row in 0..5 {
                let kind = if col < 3 {
                    SymbolKind::Sapphire
                } else {
                    SymbolKind::Topaz
                };
                grid.set(col, row, Symbol::new(kind));
            }
        }
        let clusters = grid.find_clusters(8);
        assert_eq!(clusters.len(), 2);
        // Sapphire discovered first at (0,0), topaz at (3,0)
        assert_eq!(clusters[0].kind, SymbolKind::Sapphire);
        assert_eq!(clusters[1].kind, SymbolKind::Topaz);
    }

    #[test]
    fn test_detection_is_pure() {
        let config = GameConfig::default();
        let mut rng = SpinRng::seeded("pure").unwrap();
        let mut grid = Grid::new(config.cols, config.rows);
        grid.fill(&mut rng, &config).unwrap();
        let a = grid.find_clusters(8);
        let b = grid.find_clusters(8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_scatters_never_cluster() {
        let grid = full_grid_of(SymbolKind::Scatter, 6, 5);
        assert!(grid.find_clusters(8).is_empty());
        assert_eq!(grid.scatter_count(), 30);
    }

    #[test]
    fn test_cluster_tracks_highest_multiplier() {
        let mut grid = full_grid_of(SymbolKind::Ruby, 6, 5);
        grid.set(2, 2, Symbol::with_multiplier(SymbolKind::Ruby, 10));
        grid.set(4, 1, Symbol::with_multiplier(SymbolKind::Ruby, 5));
        let clusters = grid.find_clusters(8);
        assert_eq!(clusters[0].highest_multiplier, 10);
    }

    #[test]
    fn test_collapse_preserves_order_and_refills() {
        let config = GameConfig::default();
        let mut rng = SpinRng::seeded("collapse").unwrap();
        let mut grid = Grid::new(3, 4);
        // Column 0 top to bottom: Amber, Topaz, Emerald, Ruby
        for (row, kind) in [
            SymbolKind::Amber,
            SymbolKind::Topaz,
            SymbolKind::Emerald,
            SymbolKind::Ruby,
        ]
        .into_iter()
        .enumerate()
        {
            for col in 0..3 {
                grid.set(col, row, Symbol::new(kind));
            }
        }

        // Remove the middle two rows of column 0
        grid.remove(&[Cluster {
            kind: SymbolKind::Topaz,
            cells: vec![(0, 1), (0, 2)],
            highest_multiplier: 1,
        }]);
        grid.collapse_and_refill(&mut rng, &config).unwrap();

        assert!(grid.is_full());
        // Survivors keep relative order at the bottom of the column
        assert_eq!(grid.get(0, 2).unwrap().kind, SymbolKind::Amber);
        assert_eq!(grid.get(0, 3).unwrap().kind, SymbolKind::Ruby);
        // Untouched column unchanged
        assert_eq!(grid.get(1, 0).unwrap().kind, SymbolKind::Amber);
        assert_eq!(grid.get(1, 3).unwrap().kind, SymbolKind::Ruby);
    }

    #[test]
    fn test_dimensions_stable_across_collapse() {
        let config = GameConfig::default();
        let mut rng = SpinRng::seeded("dims").unwrap();
        let mut grid = Grid::new(config.cols, config.rows);
        grid.fill(&mut rng, &config).unwrap();
        let clusters = grid.find_clusters(1);
        grid.remove(&clusters);
        grid.collapse_and_refill(&mut rng, &config).unwrap();
        assert_eq!(grid.cols(), config.cols);
        assert_eq!(grid.rows(), config.rows);
        assert!(grid.is_full());
    }
}
