use engine::{Board, CellState, GridPos};
use serde::{Deserialize, Serialize};

use crate::enemy::EnemyTuning;

const MIN_GRID: usize = 8;
const MAX_GRID: usize = 512;

/// An axis-aligned obstacle block in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleRect {
    pub r: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

/// Everything that defines one level: grid shape, the capture goal,
/// obstacle layout and enemy tuning. Loaded from JSON; every field has a
/// default so sparse files stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f64,
    /// Percent of claimable interior that clears the level.
    pub capture_goal_percent: f64,
    pub minion_count: u32,
    pub obstacles: Vec<ObstacleRect>,
    pub enemy: EnemyTuning,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: "open field".to_string(),
            rows: 80,
            cols: 80,
            cell_size: 10.0,
            capture_goal_percent: 75.0,
            minion_count: 2,
            obstacles: Vec::new(),
            enemy: EnemyTuning::default(),
        }
    }
}

impl LevelConfig {
    /// Clamp every field into a playable range and drop obstacles that do
    /// not fit strictly inside the border ring.
    pub fn sanitized(mut self) -> Self {
        self.rows = self.rows.clamp(MIN_GRID, MAX_GRID);
        self.cols = self.cols.clamp(MIN_GRID, MAX_GRID);
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            self.cell_size = 10.0;
        }
        self.capture_goal_percent = if self.capture_goal_percent.is_finite() {
            self.capture_goal_percent.clamp(1.0, 100.0)
        } else {
            75.0
        };
        self.minion_count = self.minion_count.min(32);
        let (rows, cols) = (self.rows, self.cols);
        self.obstacles.retain(|o| {
            o.w >= 1 && o.h >= 1 && o.r >= 1 && o.c >= 1 && o.r + o.h < rows && o.c + o.w < cols
        });
        self.enemy = self.enemy.sanitized();
        self
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Fresh board for this level: border ring Filled, obstacles stamped
    /// over Empty interior cells.
    pub fn build_board(&self) -> Board {
        let mut board = Board::new(self.rows, self.cols, self.cell_size);
        for o in &self.obstacles {
            for r in o.r..o.r + o.h {
                for c in o.c..o.c + o.w {
                    let pos = GridPos::new(r, c);
                    if board.is_empty(pos) {
                        board.set_cell(pos, CellState::Obstacle);
                    }
                }
            }
        }
        board
    }
}
