use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{Board, CellState, GridPos, OverlayKind};

/// A Filled cell with at least one Empty 4-neighbor; `open` is the
/// neighbor count (1..=4). Cells with exactly two open neighbors anchor
/// partition-line detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corner {
    pub pos: GridPos,
    pub open: u8,
}

/// One cell of a detected partition line together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionCell {
    pub pos: GridPos,
    pub kind: OverlayKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// A ray cast from a corner along one axis. `cells` is only populated when
/// the ray reached a Filled cell before leaving the grid.
#[derive(Debug, Default)]
struct Ray {
    cells: Vec<GridPos>,
    ok: bool,
}

impl Board {
    /// Report every Filled cell that borders open space, with its count of
    /// Empty 4-neighbors.
    pub fn find_captured_corners(&self) -> Vec<Corner> {
        let mut out = Vec::new();
        for pos in self.positions() {
            if !self.is_filled(pos) {
                continue;
            }
            let open = self.neighbors4(pos).filter(|&n| self.is_empty(n)).count() as u8;
            if (1..=4).contains(&open) {
                out.push(Corner { pos, open });
            }
        }
        out
    }

    /// Detect partition lines anchored at two-open-neighbor corners and
    /// persist the Primary/Secondary classification onto each cell's
    /// overlay metadata. Returns the merged cell classifications in
    /// deterministic (row-major) order.
    pub fn find_partition_lines(&mut self) -> Vec<PartitionCell> {
        self.clear_overlays();

        let corners: Vec<GridPos> = self
            .find_captured_corners()
            .into_iter()
            .filter(|corner| corner.open == 2)
            .map(|corner| corner.pos)
            .collect();

        let mut classified: BTreeMap<GridPos, OverlayKind> = BTreeMap::new();

        for corner in corners {
            // Pick one open direction per axis, preferring left over right
            // and up over down when both sides are open.
            let open = |pos: Option<GridPos>| pos.is_some_and(|p| self.is_empty(p));
            let left = corner.c.checked_sub(1).map(|c| GridPos::new(corner.r, c));
            let right = (corner.c + 1 < self.cols()).then(|| GridPos::new(corner.r, corner.c + 1));
            let up = corner.r.checked_sub(1).map(|r| GridPos::new(r, corner.c));
            let down = (corner.r + 1 < self.rows()).then(|| GridPos::new(corner.r + 1, corner.c));

            let horiz_step: Option<isize> = if open(left) {
                Some(-1)
            } else if open(right) {
                Some(1)
            } else {
                None
            };
            let vert_step: Option<isize> = if open(up) {
                Some(-1)
            } else if open(down) {
                Some(1)
            } else {
                None
            };

            let horiz = match horiz_step {
                Some(step) => self.cast_ray(corner, Axis::Horizontal, step),
                None => Ray::default(),
            };
            let vert = match vert_step {
                Some(step) => self.cast_ray(corner, Axis::Vertical, step),
                None => Ray::default(),
            };

            if !horiz.ok && !vert.ok {
                continue;
            }

            // Longer successful axis is Primary; ties favor horizontal.
            let horiz_primary = horiz.cells.len() >= vert.cells.len();
            let (horiz_kind, vert_kind) = if horiz_primary {
                (OverlayKind::Primary, OverlayKind::Secondary)
            } else {
                (OverlayKind::Secondary, OverlayKind::Primary)
            };

            for &pos in &horiz.cells {
                upgrade(&mut classified, pos, horiz_kind);
            }
            for &pos in &vert.cells {
                upgrade(&mut classified, pos, vert_kind);
            }
        }

        let out: Vec<PartitionCell> = classified
            .into_iter()
            .map(|(pos, kind)| PartitionCell { pos, kind })
            .collect();
        for cell in &out {
            self.set_overlay(cell.pos, cell.kind);
        }
        out
    }

    /// Extend a ray from `corner` along `axis`, through Empty and Obstacle
    /// cells (obstacles do not block), until a Filled cell is met. A ray
    /// that leaves the grid first is discarded.
    fn cast_ray(&self, corner: GridPos, axis: Axis, step: isize) -> Ray {
        let mut ray = Ray::default();
        let mut r = corner.r as isize;
        let mut c = corner.c as isize;
        loop {
            match axis {
                Axis::Horizontal => c += step,
                Axis::Vertical => r += step,
            }
            if r < 0 || c < 0 || r as usize >= self.rows() || c as usize >= self.cols() {
                // left the grid without hitting a Filled cell
                ray.cells.clear();
                return ray;
            }
            let pos = GridPos::new(r as usize, c as usize);
            match self.state(pos) {
                Some(CellState::Filled) => {
                    ray.ok = !ray.cells.is_empty();
                    if !ray.ok {
                        ray.cells.clear();
                    }
                    return ray;
                }
                Some(CellState::Empty) | Some(CellState::Obstacle) => ray.cells.push(pos),
                None => {
                    ray.cells.clear();
                    return ray;
                }
            }
        }
    }

}

/// Primary is never downgraded; Secondary is upgraded when a later ray
/// claims the cell as Primary.
fn upgrade(map: &mut BTreeMap<GridPos, OverlayKind>, pos: GridPos, kind: OverlayKind) {
    if map.get(&pos) != Some(&OverlayKind::Primary) {
        map.insert(pos, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_notch() -> Board {
        // 8x8 board with a filled block jutting into the interior so a
        // two-open-neighbor corner exists at its tip.
        let mut board = Board::new(8, 8, 10.0);
        for c in 1..=3 {
            board.set_cell(GridPos::new(3, c), CellState::Filled);
        }
        board
    }

    #[test]
    fn corners_count_open_neighbors() {
        let board = board_with_notch();
        let corners = board.find_captured_corners();
        let tip = corners
            .iter()
            .find(|corner| corner.pos == GridPos::new(3, 3))
            .expect("notch tip should be reported");
        // tip is open above, below and to the right
        assert_eq!(tip.open, 3);

        let shaft = corners
            .iter()
            .find(|corner| corner.pos == GridPos::new(3, 2))
            .expect("notch shaft should be reported");
        assert_eq!(shaft.open, 2);
    }

    #[test]
    fn fully_enclosed_filled_cell_is_not_a_corner() {
        let mut board = Board::new(8, 8, 10.0);
        for pos in board.positions().collect::<Vec<_>>() {
            board.set_cell(pos, CellState::Filled);
        }
        assert!(board.find_captured_corners().is_empty());
    }

    #[test]
    fn partition_lines_mark_cells_and_persist_overlay() {
        let mut board = board_with_notch();
        let lines = board.find_partition_lines();
        assert!(!lines.is_empty());
        for cell in &lines {
            assert_eq!(board.overlay(cell.pos), Some(cell.kind));
        }
    }

    #[test]
    fn vertical_ray_from_notch_shaft_reaches_both_walls() {
        let mut board = board_with_notch();
        let lines = board.find_partition_lines();
        // the shaft corner at (3,2) is open above and below; its vertical
        // rays run up to row 0 and down to row 7, both Filled
        let above = GridPos::new(2, 2);
        let below = GridPos::new(4, 2);
        assert!(lines.iter().any(|cell| cell.pos == above));
        assert!(lines.iter().any(|cell| cell.pos == below));
    }

    #[test]
    fn primary_never_downgraded_on_merge() {
        let mut map = BTreeMap::new();
        let pos = GridPos::new(1, 1);
        upgrade(&mut map, pos, OverlayKind::Primary);
        upgrade(&mut map, pos, OverlayKind::Secondary);
        assert_eq!(map.get(&pos), Some(&OverlayKind::Primary));

        let other = GridPos::new(2, 2);
        upgrade(&mut map, other, OverlayKind::Secondary);
        upgrade(&mut map, other, OverlayKind::Primary);
        assert_eq!(map.get(&other), Some(&OverlayKind::Primary));
    }
}
