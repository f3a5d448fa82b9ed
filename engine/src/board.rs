use serde::{Deserialize, Serialize};

use crate::geom::Vec2;

/// Authoritative per-cell state. Once a cell turns `Filled` it never reverts
/// within a level (monotonic claim); overlay metadata is advisory and is
/// cleared whenever the cell is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Empty,
    Filled,
    Obstacle,
}

/// Partition-line classification attached to cells by
/// [`Board::find_partition_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    Primary,
    Secondary,
}

/// Integral grid coordinate, usable directly as a hash/set key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPos {
    pub r: usize,
    pub c: usize,
}

impl GridPos {
    pub fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub state: CellState,
    /// Partition-line classification, if the cell sits on a detected line.
    pub overlay: Option<OverlayKind>,
    /// Id of the cave this cell belongs to, for O(1) membership lookups.
    pub cave: Option<u32>,
}

/// The fixed-size cell grid for one level. Dimensions never change within a
/// level's lifetime; the border ring starts `Filled`, the interior `Empty`
/// (obstacles are stamped on top by level setup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    cell_size: f64,
    cells: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(rows: usize, cols: usize, cell_size: f64) -> Self {
        let mut board = Self {
            rows,
            cols,
            cell_size,
            cells: vec![vec![Cell::default(); cols]; rows],
        };
        board.reset();
        board
    }

    /// Restore the level-start invariant: border `Filled`, interior `Empty`,
    /// all overlay metadata cleared.
    pub fn reset(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let state = if r == 0 || c == 0 || r == self.rows - 1 || c == self.cols - 1 {
                    CellState::Filled
                } else {
                    CellState::Empty
                };
                self.cells[r][c] = Cell {
                    state,
                    overlay: None,
                    cave: None,
                };
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.r < self.rows && pos.c < self.cols
    }

    pub fn cell(&self, pos: GridPos) -> Option<&Cell> {
        self.cells.get(pos.r)?.get(pos.c)
    }

    /// Write one cell. Clears stale overlay/cave metadata on that cell.
    /// No-op outside grid bounds.
    pub fn set_cell(&mut self, pos: GridPos, state: CellState) {
        if let Some(row) = self.cells.get_mut(pos.r) {
            if let Some(cell) = row.get_mut(pos.c) {
                cell.state = state;
                cell.overlay = None;
                cell.cave = None;
            }
        }
    }

    pub fn state(&self, pos: GridPos) -> Option<CellState> {
        self.cell(pos).map(|cell| cell.state)
    }

    pub fn is_empty(&self, pos: GridPos) -> bool {
        self.state(pos) == Some(CellState::Empty)
    }

    pub fn is_filled(&self, pos: GridPos) -> bool {
        self.state(pos) == Some(CellState::Filled)
    }

    pub fn is_obstacle(&self, pos: GridPos) -> bool {
        self.state(pos) == Some(CellState::Obstacle)
    }

    pub fn overlay(&self, pos: GridPos) -> Option<OverlayKind> {
        self.cell(pos).and_then(|cell| cell.overlay)
    }

    pub fn cave_id(&self, pos: GridPos) -> Option<u32> {
        self.cell(pos).and_then(|cell| cell.cave)
    }

    pub(crate) fn set_overlay(&mut self, pos: GridPos, overlay: OverlayKind) {
        if let Some(row) = self.cells.get_mut(pos.r) {
            if let Some(cell) = row.get_mut(pos.c) {
                cell.overlay = Some(overlay);
            }
        }
    }

    pub(crate) fn set_cave_id(&mut self, pos: GridPos, id: u32) {
        if let Some(row) = self.cells.get_mut(pos.r) {
            if let Some(cell) = row.get_mut(pos.c) {
                cell.cave = Some(id);
            }
        }
    }

    /// Clear every cell's cave id without touching cell state. Cave
    /// detection re-stamps membership from scratch on each run.
    pub(crate) fn clear_cave_ids(&mut self) {
        for row in &mut self.cells {
            for cell in row {
                cell.cave = None;
            }
        }
    }

    /// Clear every cell's partition-line classification. Partition-line
    /// detection re-stamps the overlay wholesale on each run.
    pub(crate) fn clear_overlays(&mut self) {
        for row in &mut self.cells {
            for cell in row {
                cell.overlay = None;
            }
        }
    }

    /// Grid cell containing the world point, clamped to the board.
    pub fn cell_for(&self, world: Vec2) -> GridPos {
        let r = ((world.y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        let c = ((world.x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        GridPos::new(r, c)
    }

    /// World-space center of a cell.
    pub fn world_for_cell(&self, pos: GridPos) -> Vec2 {
        Vec2::new(
            pos.c as f64 * self.cell_size + self.cell_size / 2.0,
            pos.r as f64 * self.cell_size + self.cell_size / 2.0,
        )
    }

    /// In-bounds 4-neighbors of a cell.
    pub fn neighbors4(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        let GridPos { r, c } = pos;
        let mut out = [None; 4];
        if r > 0 {
            out[0] = Some(GridPos::new(r - 1, c));
        }
        if r + 1 < self.rows {
            out[1] = Some(GridPos::new(r + 1, c));
        }
        if c > 0 {
            out[2] = Some(GridPos::new(r, c - 1));
        }
        if c + 1 < self.cols {
            out[3] = Some(GridPos::new(r, c + 1));
        }
        out.into_iter().flatten()
    }

    /// Whether a cell lies on the outer board border.
    pub fn on_border(&self, pos: GridPos) -> bool {
        pos.r == 0 || pos.c == 0 || pos.r == self.rows - 1 || pos.c == self.cols - 1
    }

    /// Cell positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| GridPos::new(r, c)))
    }
}
