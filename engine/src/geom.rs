use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// 2D world-space vector. Cell coordinates live in [`crate::board::GridPos`];
/// everything continuous (player, enemies, trail points, wall segments) uses
/// this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, rhs: Vec2) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, rhs: Vec2) -> f64 {
        (self - rhs).length()
    }

    /// Unit vector in the same direction, or zero when the length is zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// A world-space line segment, used for trail walls and synthesized
/// partition walls in the wall-aware flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }
}

/// Axis-aligned rectangle given by its top-left corner and extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

/// Result of a circle-vs-rectangle overlap test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// How far the circle overlaps the rectangle along `normal`.
    pub depth: f64,
    /// Unit contact normal pointing from the rectangle toward the circle
    /// center.
    pub normal: Vec2,
}

/// Twice the signed area of the triangle `p, q, r`. Positive when the turn
/// `p -> q -> r` is clockwise in screen coordinates (y down).
pub fn orient(p: Vec2, q: Vec2, r: Vec2) -> f64 {
    (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y)
}

/// Whether `q` lies within the axis-aligned bounding box of `p` and `r`.
/// Only meaningful when the three points are collinear (`orient == 0`).
pub fn on_segment(p: Vec2, q: Vec2, r: Vec2) -> bool {
    p.x.min(r.x) <= q.x && q.x <= p.x.max(r.x) && p.y.min(r.y) <= q.y && q.y <= p.y.max(r.y)
}

/// General segment intersection: proper crossings via opposite-sign
/// orientation pairs, collinear overlap via the bounding test. Symmetric
/// under swapping the two segments.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1 == 0.0 && on_segment(a1, b1, a2) {
        return true;
    }
    if o2 == 0.0 && on_segment(a1, b2, a2) {
        return true;
    }
    if o3 == 0.0 && on_segment(b1, a1, b2) {
        return true;
    }
    if o4 == 0.0 && on_segment(b1, a2, b2) {
        return true;
    }

    ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
}

/// Distance from `p` to the segment `a..b`: project onto the carrying line,
/// clamp the parameter to [0, 1], measure to the clamped point. A degenerate
/// segment collapses to point distance.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let v = b - a;
    let w = p - a;
    let c2 = v.dot(v);
    let t = if c2 == 0.0 {
        0.0
    } else {
        (w.dot(v) / c2).clamp(0.0, 1.0)
    };
    (a + v * t).distance(p)
}

/// Closest parameter of `p` along the segment `a..b`, clamped to [0, 1].
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let v = b - a;
    let c2 = v.dot(v);
    let t = if c2 == 0.0 {
        0.0
    } else {
        ((p - a).dot(v) / c2).clamp(0.0, 1.0)
    };
    a + v * t
}

/// Circle-vs-rect overlap. Returns `None` when the distance from the circle
/// center to the nearest rectangle point is at least `radius`. When the
/// center lies strictly inside the rectangle the contact normal is the axis
/// pointing to the nearest of the four sides.
pub fn circle_rect_penetration(center: Vec2, radius: f64, rect: Rect) -> Option<Penetration> {
    let nearest = Vec2::new(
        center.x.clamp(rect.x, rect.x + rect.w),
        center.y.clamp(rect.y, rect.y + rect.h),
    );

    if nearest == center {
        // Center inside the rect: push out along the closest side.
        let to_left = center.x - rect.x;
        let to_right = rect.x + rect.w - center.x;
        let to_top = center.y - rect.y;
        let to_bottom = rect.y + rect.h - center.y;

        let min = to_left.min(to_right).min(to_top).min(to_bottom);
        let (normal, dist_to_side) = if min == to_left {
            (Vec2::new(-1.0, 0.0), to_left)
        } else if min == to_right {
            (Vec2::new(1.0, 0.0), to_right)
        } else if min == to_top {
            (Vec2::new(0.0, -1.0), to_top)
        } else {
            (Vec2::new(0.0, 1.0), to_bottom)
        };
        return Some(Penetration {
            depth: radius + dist_to_side,
            normal,
        });
    }

    let delta = center - nearest;
    let dist = delta.length();
    if dist >= radius {
        return None;
    }

    Some(Penetration {
        depth: radius - dist,
        normal: delta.normalized(),
    })
}

/// Reflect `v` across the unit normal `n`: `v - 2(v.n)n`. Collision
/// resolution applies a damping factor on top of this.
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    let dot = v.dot(n);
    v - n * (2.0 * dot)
}
