use std::collections::HashSet;

use engine::{CellState, GridPos, OverlayKind, PartitionCell};
use serde::{Deserialize, Serialize};

use crate::enemy::EnemyKind;
use crate::session::{CELL_SCORE, OBSTACLE_CELL_BONUS, Session, cave_params};
use crate::trail::CaptureState;

/// Why the current level ended in the player's favor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelClearReason {
    /// A capture separated the enemies into two or more regions.
    Split,
    /// A capture left no region containing an enemy.
    NoEnemiesRemain,
    /// The claimed percentage reached the level goal.
    PercentGoal,
}

/// Everything one finalized capture changed, for scoring and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    /// Cells claimed by the enemy-free region fill. The rasterized trail
    /// turns Filled too but is not counted here.
    pub new_filled: u32,
    pub destroyed_obstacle_cells: u32,
    pub split_occurred: bool,
    pub no_enemies_remain: bool,
    /// Multiplier in effect after this capture.
    pub combo_multiplier: u32,
    pub score_delta: u32,
}

impl Session {
    /// Close out the active trail after the player reached Filled ground.
    ///
    /// The trail (plus the closing segment to the player's landing cell) is
    /// rasterized into the grid, every resulting region without an enemy is
    /// claimed, fully enclosed obstacle blocks are destroyed, and the score
    /// and win signals are updated. Unless the level ended, the partition
    /// and cave overlays are recomputed for the new open area.
    pub(crate) fn finalize_capture(&mut self) -> CaptureOutcome {
        // the trail becomes claimed boundary, but only the enclosed region
        // fill below counts toward new_filled
        let mut path: Vec<GridPos> = self.trail.points().iter().map(|p| p.cell).collect();
        path.push(self.board.cell_for(self.player.pos));
        for pair in path.windows(2) {
            for pos in bresenham(pair[0], pair[1]) {
                if self.board.is_empty(pos) {
                    self.board.set_cell(pos, CellState::Filled);
                }
            }
        }

        let mut new_filled = 0u32;

        let regions = self.board.flood_fill_regions();
        let enemy_cells: Vec<GridPos> = self
            .enemies
            .iter()
            .map(|enemy| self.board.cell_for(enemy.pos))
            .collect();
        let mut occupied_regions = 0usize;
        for region in &regions {
            if enemy_cells.iter().any(|&cell| region.contains(cell)) {
                occupied_regions += 1;
                continue;
            }
            for &pos in &region.cells {
                self.board.set_cell(pos, CellState::Filled);
                new_filled += 1;
            }
        }

        let destroyed = self.destroy_enclosed_obstacles();

        let speed_mult = if self.capture_slow { 2 } else { 1 };
        let score_delta = new_filled * CELL_SCORE * speed_mult * self.combo_multiplier
            + destroyed * OBSTACLE_CELL_BONUS;
        self.score += score_delta;
        self.high_score = self.high_score.max(self.score);

        let split_occurred = occupied_regions >= 2;
        let no_enemies_remain = self.enemies.is_empty();

        self.trail.clear();
        self.fuse.reset();
        self.state = CaptureState::Idle;
        self.capture_slow = false;

        if split_occurred {
            self.combo_multiplier += 1;
            self.spawn_enemy(EnemyKind::Minion);
            self.level_clear = Some(LevelClearReason::Split);
        } else if no_enemies_remain {
            self.level_clear = Some(LevelClearReason::NoEnemiesRemain);
        } else {
            self.refresh_overlays();
        }

        self.update_percent();
        self.update_enemy_sizes();

        CaptureOutcome {
            new_filled,
            destroyed_obstacle_cells: destroyed,
            split_occurred,
            no_enemies_remain,
            combo_multiplier: self.combo_multiplier,
            score_delta,
        }
    }

    /// Corner, partition-line and cave detection over the current grid.
    pub(crate) fn refresh_overlays(&mut self) {
        self.corners = self.board.find_captured_corners();
        self.partition_cells = self.board.find_partition_lines();
        let walls = partition_wall_cells(&self.partition_cells);
        self.caves = self.board.detect_caves(&cave_params(), &walls);
    }

    /// Convert every obstacle block with no Empty neighbor to Filled.
    /// Returns the destroyed cell count.
    fn destroy_enclosed_obstacles(&mut self) -> u32 {
        let mut seen: HashSet<GridPos> = HashSet::new();
        let mut destroyed = 0u32;

        for start in self.board.positions().collect::<Vec<_>>() {
            if !self.board.is_obstacle(start) || seen.contains(&start) {
                continue;
            }
            let mut stack = vec![start];
            seen.insert(start);
            let mut block = Vec::new();
            let mut enclosed = true;
            while let Some(pos) = stack.pop() {
                block.push(pos);
                for next in self.board.neighbors4(pos) {
                    if self.board.is_obstacle(next) {
                        if seen.insert(next) {
                            stack.push(next);
                        }
                    } else if self.board.is_empty(next) {
                        enclosed = false;
                    }
                }
            }
            if enclosed {
                destroyed += block.len() as u32;
                for pos in block {
                    self.board.set_cell(pos, CellState::Filled);
                }
            }
        }

        destroyed
    }
}

/// Grid cells of the line from `a` to `b`, endpoints included.
fn bresenham(a: GridPos, b: GridPos) -> Vec<GridPos> {
    let (mut r, mut c) = (a.r as isize, a.c as isize);
    let (r1, c1) = (b.r as isize, b.c as isize);
    let dr = (r1 - r).abs();
    let dc = (c1 - c).abs();
    let sr = if r < r1 { 1 } else { -1 };
    let sc = if c < c1 { 1 } else { -1 };
    let mut err = dc - dr;
    let mut out = Vec::new();
    loop {
        out.push(GridPos::new(r as usize, c as usize));
        if r == r1 && c == c1 {
            return out;
        }
        let e2 = 2 * err;
        if e2 > -dr {
            err -= dr;
            c += sc;
        }
        if e2 < dc {
            err += dc;
            r += sr;
        }
    }
}

/// Wall cells handed to cave detection: the Secondary partition cells,
/// dilated by any directly adjacent Primary cells so wall runs stay
/// connected across junctions.
fn partition_wall_cells(cells: &[PartitionCell]) -> Vec<GridPos> {
    let primary: HashSet<GridPos> = cells
        .iter()
        .filter(|cell| cell.kind == OverlayKind::Primary)
        .map(|cell| cell.pos)
        .collect();

    let mut seen: HashSet<GridPos> = HashSet::new();
    let mut out = Vec::new();
    for cell in cells {
        if cell.kind != OverlayKind::Secondary {
            continue;
        }
        if seen.insert(cell.pos) {
            out.push(cell.pos);
        }
        let GridPos { r, c } = cell.pos;
        let mut neighbors = Vec::with_capacity(4);
        if r > 0 {
            neighbors.push(GridPos::new(r - 1, c));
        }
        neighbors.push(GridPos::new(r + 1, c));
        if c > 0 {
            neighbors.push(GridPos::new(r, c - 1));
        }
        neighbors.push(GridPos::new(r, c + 1));
        for n in neighbors {
            if primary.contains(&n) && seen.insert(n) {
                out.push(n);
            }
        }
    }
    out
}
