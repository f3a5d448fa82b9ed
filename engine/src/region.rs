use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::board::{Board, GridPos};
use crate::geom::{Segment, Vec2, segments_intersect};

/// A maximal 4-connected set of Empty cells. Regions are recomputed on
/// demand from the current grid and never persisted across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub cells: Vec<GridPos>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.cells.contains(&pos)
    }
}

impl Board {
    /// Partition all Empty cells into 4-connected regions via a stack-based
    /// flood fill. Region order follows row-major discovery; region content
    /// is deterministic for a given grid.
    pub fn flood_fill_regions(&self) -> Vec<Region> {
        let mut visited = vec![vec![false; self.cols()]; self.rows()];
        let mut regions = Vec::new();

        for start in self.positions() {
            if !self.is_empty(start) || visited[start.r][start.c] {
                continue;
            }
            let mut stack = vec![start];
            visited[start.r][start.c] = true;
            let mut cells = Vec::new();
            while let Some(pos) = stack.pop() {
                cells.push(pos);
                for next in self.neighbors4(pos) {
                    if !visited[next.r][next.c] && self.is_empty(next) {
                        visited[next.r][next.c] = true;
                        stack.push(next);
                    }
                }
            }
            regions.push(Region { cells });
        }

        regions
    }

    /// Same partition, but a move between two Empty cell centers is
    /// disallowed when the connecting segment crosses any wall segment.
    /// Used to subdivide an open area along an explicit boundary (finalized
    /// trail, synthesized partition line) without mutating the grid.
    pub fn flood_fill_regions_with_walls(&self, walls: &[Segment]) -> Vec<Region> {
        let can_move = |from: GridPos, to: GridPos| -> bool {
            if !self.is_empty(from) || !self.is_empty(to) {
                return false;
            }
            let p1 = self.world_for_cell(from);
            let p2 = self.world_for_cell(to);
            !walls
                .iter()
                .any(|w| segments_intersect(p1, p2, w.a, w.b))
        };

        let mut visited = vec![vec![false; self.cols()]; self.rows()];
        let mut regions = Vec::new();

        for start in self.positions() {
            if !self.is_empty(start) || visited[start.r][start.c] {
                continue;
            }
            let mut stack = vec![start];
            visited[start.r][start.c] = true;
            let mut cells = Vec::new();
            while let Some(pos) = stack.pop() {
                cells.push(pos);
                for next in self.neighbors4(pos) {
                    if !visited[next.r][next.c] && can_move(pos, next) {
                        visited[next.r][next.c] = true;
                        stack.push(next);
                    }
                }
            }
            regions.push(Region { cells });
        }

        regions
    }

    /// Breadth-first search for the Filled cell nearest to a world point,
    /// returning its center. Used for respawn placement.
    pub fn find_nearest_filled_cell(&self, world: Vec2) -> Option<Vec2> {
        let start = self.cell_for(world);
        let mut visited = vec![vec![false; self.cols()]; self.rows()];
        let mut queue = VecDeque::from([start]);
        visited[start.r][start.c] = true;

        while let Some(pos) = queue.pop_front() {
            if self.is_filled(pos) {
                return Some(self.world_for_cell(pos));
            }
            for next in self.neighbors4(pos) {
                if !visited[next.r][next.c] {
                    visited[next.r][next.c] = true;
                    queue.push_back(next);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CellState;

    #[test]
    fn single_open_interior_is_one_region() {
        let board = Board::new(10, 10, 10.0);
        let regions = board.flood_fill_regions();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].len(), 8 * 8);
    }

    #[test]
    fn filled_column_splits_interior_in_two() {
        let mut board = Board::new(10, 10, 10.0);
        for r in 0..10 {
            board.set_cell(GridPos::new(r, 5), CellState::Filled);
        }
        let regions = board.flood_fill_regions();
        assert_eq!(regions.len(), 2);
        let mut sizes: Vec<usize> = regions.iter().map(Region::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![8 * 3, 8 * 4]);
    }

    #[test]
    fn wall_segment_splits_without_grid_mutation() {
        let board = Board::new(10, 10, 10.0);
        // vertical wall through the middle of the interior, spanning the
        // full board height so no path can route around it
        let wall = Segment::new(Vec2::new(55.0, 0.0), Vec2::new(55.0, 100.0));
        let walled = board.flood_fill_regions_with_walls(&[wall]);
        assert_eq!(walled.len(), 2);

        // grid untouched: the plain fill still sees one region
        assert_eq!(board.flood_fill_regions().len(), 1);
    }

    #[test]
    fn nearest_filled_cell_walks_to_border() {
        let board = Board::new(10, 10, 10.0);
        let center = Vec2::new(50.0, 50.0);
        let found = board
            .find_nearest_filled_cell(center)
            .expect("border is filled, search must succeed");
        let pos = board.cell_for(found);
        assert!(board.is_filled(pos));
        assert!(board.on_border(pos));
    }
}
