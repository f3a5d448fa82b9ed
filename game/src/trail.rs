use engine::geom::{Vec2, segments_intersect};
use engine::GridPos;
use serde::{Deserialize, Serialize};

/// One vertex of the active trail: the player's world position at the
/// moment it entered `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub cell: GridPos,
}

/// Why a proposed trail extension was rejected. Either way the attempt is
/// fatal to the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailBreak {
    /// The destination cell already appears somewhere in the trail.
    SelfTouch,
    /// The new segment crosses a non-adjacent existing segment.
    Crossing,
}

/// The player's in-progress path through Empty space. Invariant: no two
/// points share a cell coordinate; a violating extension is rejected
/// before it is appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    points: Vec<TrailPoint>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, point: TrailPoint) {
        self.points.clear();
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[TrailPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TrailPoint> {
        self.points.last()
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn contains_cell(&self, cell: GridPos) -> bool {
        self.points.iter().any(|p| p.cell == cell)
    }

    /// Append a point after validating the two legality rules: the
    /// destination cell must be unvisited, and the new segment must not
    /// cross any existing segment other than the one immediately adjacent
    /// to it. On rejection the trail is left untouched.
    pub fn try_extend(&mut self, point: TrailPoint) -> Result<(), TrailBreak> {
        if self.contains_cell(point.cell) {
            return Err(TrailBreak::SelfTouch);
        }

        if let Some(last) = self.points.last() {
            // segments (i, i+1); the adjacent one ends at `last`
            for window in self.points.windows(2).rev().skip(1) {
                if segments_intersect(last.pos, point.pos, window[0].pos, window[1].pos) {
                    return Err(TrailBreak::Crossing);
                }
            }
        }

        self.points.push(point);
        Ok(())
    }
}

/// Idle-trail countdown: once the player stops moving mid-capture for
/// `delay` seconds, the fuse starts consuming the trail from its start at
/// `speed` segments per second. Any movement resets it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fuse {
    pub lit: bool,
    /// Segments consumed so far.
    pub progress: f64,
    /// Consumption rate in segments per second.
    pub speed: f64,
    /// Idle time before the fuse lights, in seconds.
    pub delay: f64,
    idle: f64,
}

impl Default for Fuse {
    fn default() -> Self {
        Self {
            lit: false,
            progress: 0.0,
            speed: 0.6,
            delay: 0.6,
            idle: 0.0,
        }
    }
}

impl Fuse {
    pub fn reset(&mut self) {
        self.lit = false;
        self.progress = 0.0;
        self.idle = 0.0;
    }

    /// Movement cancels the fuse and the idle countdown.
    pub fn note_movement(&mut self) {
        self.reset();
    }

    /// Accumulate idle time while capturing; returns true the moment the
    /// fuse lights.
    pub fn tick_idle(&mut self, dt: f64) -> bool {
        if self.lit {
            return false;
        }
        self.idle += dt;
        if self.idle >= self.delay {
            self.lit = true;
            self.progress = 0.0;
            return true;
        }
        false
    }

    /// Burn along the trail; returns true when the fuse has consumed every
    /// segment and reached the player.
    pub fn tick_burn(&mut self, dt: f64, segment_count: usize) -> bool {
        if !self.lit {
            return false;
        }
        self.progress += self.speed * dt;
        self.progress >= segment_count as f64
    }
}

/// Trail-machine state. `Dead` is transient: the session resolves it into
/// a respawn or game over on the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Fusing,
    Dead,
}
