use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::board::{Board, GridPos};
use crate::geom::Segment;

/// Tuning for cave detection. The relative and absolute pocket thresholds
/// combine: a pocket survives when its cell count is at most
/// `max(region_size * pocket_fraction, pocket_absolute)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaveParams {
    /// Minimum cell count for a region or pocket to qualify.
    pub min_size: usize,
    /// Upper bound on erosion steps; guarantees termination on
    /// pathological shapes.
    pub max_erosion_steps: u32,
    /// Relative pocket-size threshold, as a fraction of the region size.
    pub pocket_fraction: f64,
    /// Absolute pocket-size threshold in cells.
    pub pocket_absolute: usize,
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            min_size: 4,
            max_erosion_steps: 12,
            pocket_fraction: 0.2,
            pocket_absolute: 200,
        }
    }
}

/// Inclusive cell-coordinate bounding box.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BBox {
    pub rmin: usize,
    pub rmax: usize,
    pub cmin: usize,
    pub cmax: usize,
}

impl BBox {
    fn of(cells: &[GridPos]) -> Option<BBox> {
        let first = cells.first()?;
        let mut bbox = BBox {
            rmin: first.r,
            rmax: first.r,
            cmin: first.c,
            cmax: first.c,
        };
        for pos in cells {
            bbox.rmin = bbox.rmin.min(pos.r);
            bbox.rmax = bbox.rmax.max(pos.r);
            bbox.cmin = bbox.cmin.min(pos.c);
            bbox.cmax = bbox.cmax.max(pos.c);
        }
        Some(bbox)
    }
}

/// An enclosed pocket of Empty cells. `cells` is the pre-expansion cell
/// set; `bbox` has been expanded outward to the nearest Filled cells or
/// the board edge so overlays visually reach the walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cave {
    pub id: u32,
    /// Deterministic display hue in degrees, `(id * 73) % 360`.
    pub hue: u16,
    pub cells: Vec<GridPos>,
    pub bbox: BBox,
}

impl Board {
    /// Detect enclosed caves in the open area.
    ///
    /// With `wall_cells` supplied (e.g. Secondary partition cells dilated by
    /// one cell), contiguous wall runs become explicit wall segments and
    /// every wall-separated region of at least `min_size` cells is a cave —
    /// the wall already defines the enclosure exactly, so no erosion runs.
    ///
    /// With no walls, each region is iteratively eroded (boundary peeling);
    /// when the remainder splits, each component seeds a candidate pocket
    /// which is re-expanded within the region without crossing cells removed
    /// at or before its own split step. Candidates touching the outer board
    /// edge are rejected; surviving small pockets are kept alongside the
    /// full region.
    ///
    /// In both modes bounding boxes are expanded to the nearest Filled
    /// cells, caves are deduplicated by final bbox, ids run sequentially
    /// from 1, and every member cell's `cave` metadata is stamped.
    pub fn detect_caves(&mut self, params: &CaveParams, wall_cells: &[GridPos]) -> Vec<Cave> {
        self.clear_cave_ids();

        let pending = if wall_cells.is_empty() {
            self.erosion_caves(params)
        } else {
            self.walled_caves(params, wall_cells)
        };

        let mut out: Vec<Cave> = Vec::new();
        let mut seen = HashSet::new();
        for (cells, bbox) in pending {
            let bbox = self.expand_bbox(bbox);
            if !seen.insert(bbox) {
                continue;
            }
            let id = out.len() as u32 + 1;
            let hue = ((id * 73) % 360) as u16;
            for &pos in &cells {
                self.set_cave_id(pos, id);
            }
            out.push(Cave {
                id,
                hue,
                cells,
                bbox,
            });
        }
        out
    }

    fn walled_caves(
        &self,
        params: &CaveParams,
        wall_cells: &[GridPos],
    ) -> Vec<(Vec<GridPos>, BBox)> {
        let walls = wall_segments_from_cells(self, wall_cells);
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for region in self.flood_fill_regions_with_walls(&walls) {
            if region.len() < params.min_size {
                continue;
            }
            let Some(bbox) = BBox::of(&region.cells) else {
                continue;
            };
            if !seen.insert(bbox) {
                continue;
            }
            pending.push((region.cells, bbox));
        }
        pending
    }

    fn erosion_caves(&self, params: &CaveParams) -> Vec<(Vec<GridPos>, BBox)> {
        let mut pending = Vec::new();

        for region in self.flood_fill_regions() {
            if region.len() < params.min_size {
                continue;
            }

            let region_set: BTreeSet<GridPos> = region.cells.iter().copied().collect();
            let mut remaining = region_set.clone();
            let mut removed_at: BTreeMap<GridPos, u32> = BTreeMap::new();
            // (seed cells, split step); collected across all erosion steps
            // since deeper pockets can appear after the first split
            let mut candidates: Vec<(Vec<GridPos>, u32)> = Vec::new();

            for step in 1..=params.max_erosion_steps {
                let to_remove: Vec<GridPos> = remaining
                    .iter()
                    .copied()
                    .filter(|&pos| self.is_peel_boundary(pos, &remaining))
                    .collect();
                if to_remove.is_empty() {
                    break;
                }
                for pos in to_remove {
                    removed_at.insert(pos, step);
                    remaining.remove(&pos);
                }

                let comps = components(&remaining);
                if comps.len() > 1 {
                    for comp in comps {
                        candidates.push((comp, step));
                    }
                }
            }

            let mut seen = HashSet::new();
            let mut pockets: Vec<(Vec<GridPos>, BBox)> = Vec::new();
            for (seed, step) in candidates {
                let expanded = expand_seed(&seed, step, &region_set, &removed_at);
                if expanded.iter().any(|&pos| self.on_border(pos)) {
                    // touches the outer board edge: not enclosed
                    continue;
                }
                if expanded.len() < params.min_size {
                    continue;
                }
                let Some(bbox) = BBox::of(&expanded) else {
                    continue;
                };
                if !seen.insert(bbox) {
                    continue;
                }
                pockets.push((expanded, bbox));
            }

            // the full region itself is always a cave, added once by bbox
            if let Some(full_bbox) = BBox::of(&region.cells) {
                if seen.insert(full_bbox) {
                    pending.push((region.cells.clone(), full_bbox));
                }
            }

            let limit = (region.len() as f64 * params.pocket_fraction)
                .max(params.pocket_absolute as f64);
            for (cells, bbox) in pockets {
                if cells.len() as f64 <= limit {
                    pending.push((cells, bbox));
                }
            }
        }

        pending
    }

    /// Whether a remaining cell is on the peel boundary: any 4-neighbor
    /// (including out-of-grid) lies outside the remaining set.
    fn is_peel_boundary(&self, pos: GridPos, remaining: &BTreeSet<GridPos>) -> bool {
        let GridPos { r, c } = pos;
        let neighbors = [
            (r.wrapping_sub(1), c, r == 0),
            (r + 1, c, r + 1 >= self.rows()),
            (r, c.wrapping_sub(1), c == 0),
            (r, c + 1, c + 1 >= self.cols()),
        ];
        neighbors.into_iter().any(|(nr, nc, out_of_grid)| {
            out_of_grid || !remaining.contains(&GridPos::new(nr, nc))
        })
    }

    /// Grow each bbox side outward, row and column independently, until a
    /// Filled cell or the board edge is met. All four scans use the
    /// pre-expansion spans.
    fn expand_bbox(&self, bbox: BBox) -> BBox {
        let BBox {
            rmin,
            rmax,
            cmin,
            cmax,
        } = bbox;

        let row_has_filled =
            |r: usize| (cmin..=cmax).any(|c| self.is_filled(GridPos::new(r, c)));
        let col_has_filled =
            |c: usize| (rmin..=rmax).any(|r| self.is_filled(GridPos::new(r, c)));

        let mut new_rmin = 0;
        for r in (0..rmin).rev() {
            if row_has_filled(r) {
                new_rmin = r + 1;
                break;
            }
        }
        let mut new_rmax = self.rows() - 1;
        for r in rmax + 1..self.rows() {
            if row_has_filled(r) {
                new_rmax = r - 1;
                break;
            }
        }
        let mut new_cmin = 0;
        for c in (0..cmin).rev() {
            if col_has_filled(c) {
                new_cmin = c + 1;
                break;
            }
        }
        let mut new_cmax = self.cols() - 1;
        for c in cmax + 1..self.cols() {
            if col_has_filled(c) {
                new_cmax = c - 1;
                break;
            }
        }

        BBox {
            rmin: new_rmin,
            rmax: new_rmax,
            cmin: new_cmin,
            cmax: new_cmax,
        }
    }
}

/// 4-connected components of a cell set, in deterministic order.
fn components(cells: &BTreeSet<GridPos>) -> Vec<Vec<GridPos>> {
    let mut seen: BTreeSet<GridPos> = BTreeSet::new();
    let mut comps = Vec::new();
    for &start in cells {
        if seen.contains(&start) {
            continue;
        }
        let mut stack = vec![start];
        seen.insert(start);
        let mut comp = Vec::new();
        while let Some(pos) = stack.pop() {
            comp.push(pos);
            for next in plane_neighbors4(pos) {
                if cells.contains(&next) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        comps.push(comp);
    }
    comps
}

/// Re-expand a seed component within its region, never crossing a cell
/// that was removed at or before the seed's own split step. This recovers
/// the seed's pre-erosion shape without re-absorbing sibling pockets.
fn expand_seed(
    seed: &[GridPos],
    step: u32,
    region_set: &BTreeSet<GridPos>,
    removed_at: &BTreeMap<GridPos, u32>,
) -> Vec<GridPos> {
    let mut expanded: BTreeSet<GridPos> = seed.iter().copied().collect();
    let mut queue: VecDeque<GridPos> = seed.iter().copied().collect();
    while let Some(pos) = queue.pop_front() {
        for next in plane_neighbors4(pos) {
            if !region_set.contains(&next) || expanded.contains(&next) {
                continue;
            }
            if let Some(&removed) = removed_at.get(&next) {
                if removed <= step {
                    continue;
                }
            }
            expanded.insert(next);
            queue.push_back(next);
        }
    }
    expanded.into_iter().collect()
}

/// 4-neighbors in the unbounded plane; positions at row/col 0 simply have
/// fewer neighbors. Callers bound-check via set membership.
fn plane_neighbors4(pos: GridPos) -> impl Iterator<Item = GridPos> {
    let GridPos { r, c } = pos;
    let mut out = [None; 4];
    if r > 0 {
        out[0] = Some(GridPos::new(r - 1, c));
    }
    out[1] = Some(GridPos::new(r + 1, c));
    if c > 0 {
        out[2] = Some(GridPos::new(r, c - 1));
    }
    out[3] = Some(GridPos::new(r, c + 1));
    out.into_iter().flatten()
}

/// Convert contiguous runs of wall cells into center-to-center wall
/// segments. Each unvisited cell claims the longer of its horizontal and
/// vertical runs; ties go horizontal.
fn wall_segments_from_cells(board: &Board, wall_cells: &[GridPos]) -> Vec<Segment> {
    let by_key: HashSet<GridPos> = wall_cells.iter().copied().collect();
    let mut seen: HashSet<GridPos> = HashSet::new();
    let mut walls = Vec::new();

    for &pos in wall_cells {
        if seen.contains(&pos) {
            continue;
        }

        let mut c0 = pos.c;
        while c0 > 0 && by_key.contains(&GridPos::new(pos.r, c0 - 1)) {
            c0 -= 1;
        }
        let mut c1 = pos.c;
        while by_key.contains(&GridPos::new(pos.r, c1 + 1)) {
            c1 += 1;
        }

        let mut r0 = pos.r;
        while r0 > 0 && by_key.contains(&GridPos::new(r0 - 1, pos.c)) {
            r0 -= 1;
        }
        let mut r1 = pos.r;
        while by_key.contains(&GridPos::new(r1 + 1, pos.c)) {
            r1 += 1;
        }

        let hlen = c1 - c0 + 1;
        let vlen = r1 - r0 + 1;
        if hlen >= vlen {
            for c in c0..=c1 {
                seen.insert(GridPos::new(pos.r, c));
            }
            walls.push(Segment::new(
                board.world_for_cell(GridPos::new(pos.r, c0)),
                board.world_for_cell(GridPos::new(pos.r, c1)),
            ));
        } else {
            for r in r0..=r1 {
                seen.insert(GridPos::new(r, pos.c));
            }
            walls.push(Segment::new(
                board.world_for_cell(GridPos::new(r0, pos.c)),
                board.world_for_cell(GridPos::new(r1, pos.c)),
            ));
        }
    }

    walls
}
