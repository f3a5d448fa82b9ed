use engine::geom::{
    Rect, Vec2, circle_rect_penetration, closest_point_on_segment, point_segment_distance,
    reflect,
};
use engine::{Board, GridPos};
use serde::{Deserialize, Serialize};

use crate::trail::Trail;

/// Velocity damping applied after every bounce, for walls and trail alike.
pub const BOUNCE_DAMP: f64 = 0.9;

/// Extra reach when testing an enemy against trail segments, so contact is
/// registered just before visual overlap.
const TRAIL_CONTACT_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Main,
    Minion,
}

/// Per-level enemy tuning, loaded from level config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub min_speed: f64,
    pub max_speed: f64,
    pub start_radius: f64,
    /// How quickly the visual radius chases its target, per second.
    pub radius_lerp_speed: f64,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            min_speed: 40.0,
            max_speed: 90.0,
            start_radius: 12.0,
            radius_lerp_speed: 8.0,
        }
    }
}

impl EnemyTuning {
    /// Clamp to sane bounds so a hand-edited level file cannot freeze or
    /// teleport enemies.
    pub fn sanitized(self) -> Self {
        let min_speed = self.min_speed.clamp(1.0, 1000.0);
        Self {
            min_speed,
            max_speed: self.max_speed.clamp(min_speed, 1000.0),
            start_radius: self.start_radius.clamp(1.0, 100.0),
            radius_lerp_speed: self.radius_lerp_speed.clamp(0.1, 100.0),
        }
    }
}

/// Contact between an enemy and the active trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailContact {
    pub point: Vec2,
    /// Unit normal from the contact point toward the enemy center.
    pub normal: Vec2,
}

/// A bouncing circle confined to the Empty area of the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f64,
    /// Radius the enemy is shrinking or growing toward; recomputed from
    /// its region occupancy after each capture.
    pub target_radius: f64,
    radius_lerp_speed: f64,
}

impl Enemy {
    pub fn new(kind: EnemyKind, pos: Vec2, vel: Vec2, tuning: &EnemyTuning) -> Self {
        Self {
            kind,
            pos,
            vel,
            radius: tuning.start_radius,
            target_radius: tuning.start_radius,
            radius_lerp_speed: tuning.radius_lerp_speed,
        }
    }

    pub fn cell(&self, board: &Board) -> GridPos {
        board.cell_for(self.pos)
    }

    /// Advance one tick: integrate velocity, then resolve penetration
    /// against every non-Empty cell the circle overlaps by pushing out
    /// along the contact normal and reflecting with damping.
    pub fn integrate(&mut self, dt: f64, board: &Board) {
        let mut next = self.pos + self.vel * dt;

        let size = board.cell_size();
        let r_lo = ((next.y - self.radius) / size).floor().max(0.0) as usize;
        let r_hi = ((next.y + self.radius) / size).floor().max(0.0) as usize;
        let c_lo = ((next.x - self.radius) / size).floor().max(0.0) as usize;
        let c_hi = ((next.x + self.radius) / size).floor().max(0.0) as usize;

        for r in r_lo..=r_hi.min(board.rows() - 1) {
            for c in c_lo..=c_hi.min(board.cols() - 1) {
                let pos = GridPos::new(r, c);
                if board.is_empty(pos) {
                    continue;
                }
                let rect = Rect::new(c as f64 * size, r as f64 * size, size, size);
                if let Some(pen) = circle_rect_penetration(next, self.radius, rect) {
                    next = next + pen.normal * pen.depth;
                    self.vel = reflect(self.vel, pen.normal) * BOUNCE_DAMP;
                }
            }
        }

        let max_x = board.cols() as f64 * size;
        let max_y = board.rows() as f64 * size;
        next.x = next.x.clamp(self.radius, max_x - self.radius);
        next.y = next.y.clamp(self.radius, max_y - self.radius);
        self.pos = next;
    }

    /// Nearest trail contact within reach, if any.
    pub fn trail_contact(&self, trail: &Trail) -> Option<TrailContact> {
        let reach = self.radius + TRAIL_CONTACT_MARGIN;
        let points = trail.points();
        let mut best: Option<(f64, TrailContact)> = None;
        for window in points.windows(2) {
            let dist = point_segment_distance(self.pos, window[0].pos, window[1].pos);
            if dist >= reach {
                continue;
            }
            if best.as_ref().is_none_or(|(d, _)| dist < *d) {
                let point = closest_point_on_segment(self.pos, window[0].pos, window[1].pos);
                let normal = (self.pos - point).normalized();
                best = Some((dist, TrailContact { point, normal }));
            }
        }
        best.map(|(_, contact)| contact)
    }

    /// Bounce off a contact normal and nudge out of the surface.
    pub fn bounce(&mut self, normal: Vec2) {
        self.vel = reflect(self.vel, normal) * BOUNCE_DAMP;
        self.pos = self.pos + normal * 1.0;
    }

    /// Move the visual radius toward its target.
    pub fn approach_target_radius(&mut self, dt: f64) {
        let delta = self.target_radius - self.radius;
        let step = self.radius_lerp_speed * dt;
        if delta.abs() <= step {
            self.radius = self.target_radius;
        } else {
            self.radius += step * delta.signum();
        }
    }

    pub fn overlaps_circle(&self, center: Vec2, radius: f64) -> bool {
        self.pos.distance(center) < self.radius + radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::TrailPoint;

    fn tuning() -> EnemyTuning {
        EnemyTuning {
            start_radius: 5.0,
            ..EnemyTuning::default()
        }
    }

    #[test]
    fn integrate_bounces_off_filled_border() {
        let board = Board::new(20, 20, 10.0);
        // heading straight at the left border wall
        let mut enemy = Enemy::new(
            EnemyKind::Main,
            Vec2::new(16.0, 100.0),
            Vec2::new(-60.0, 0.0),
            &tuning(),
        );
        enemy.integrate(0.1, &board);
        assert!(enemy.vel.x > 0.0, "x velocity should flip: {:?}", enemy.vel);
        assert!(enemy.pos.x >= 10.0 + enemy.radius - 1e-9);
        // damping shaves speed on the bounce
        assert!(enemy.vel.length() < 60.0);
    }

    #[test]
    fn integrate_in_open_space_keeps_velocity() {
        let board = Board::new(20, 20, 10.0);
        let mut enemy = Enemy::new(
            EnemyKind::Minion,
            Vec2::new(100.0, 100.0),
            Vec2::new(30.0, -20.0),
            &tuning(),
        );
        enemy.integrate(0.1, &board);
        assert_eq!(enemy.vel, Vec2::new(30.0, -20.0));
        assert_eq!(enemy.pos, Vec2::new(103.0, 98.0));
    }

    #[test]
    fn trail_contact_reports_nearest_segment() {
        let mut trail = Trail::new();
        trail.start(TrailPoint {
            pos: Vec2::new(50.0, 100.0),
            cell: GridPos::new(10, 5),
        });
        trail
            .try_extend(TrailPoint {
                pos: Vec2::new(150.0, 100.0),
                cell: GridPos::new(10, 15),
            })
            .unwrap();

        let enemy = Enemy::new(
            EnemyKind::Main,
            Vec2::new(100.0, 104.0),
            Vec2::ZERO,
            &tuning(),
        );
        let contact = enemy.trail_contact(&trail).expect("within reach");
        assert_eq!(contact.point, Vec2::new(100.0, 104.0 - 4.0));
        assert_eq!(contact.normal, Vec2::new(0.0, 1.0));

        let far = Enemy::new(
            EnemyKind::Main,
            Vec2::new(100.0, 140.0),
            Vec2::ZERO,
            &tuning(),
        );
        assert!(far.trail_contact(&trail).is_none());
    }

    #[test]
    fn radius_approaches_target_without_overshoot() {
        let mut enemy = Enemy::new(EnemyKind::Main, Vec2::ZERO, Vec2::ZERO, &tuning());
        enemy.target_radius = 9.0;
        enemy.approach_target_radius(0.25); // 8.0 per second
        assert_eq!(enemy.radius, 7.0);
        enemy.approach_target_radius(10.0);
        assert_eq!(enemy.radius, 9.0);
    }

    #[test]
    fn sanitized_keeps_speeds_ordered() {
        let tuning = EnemyTuning {
            min_speed: 80.0,
            max_speed: 20.0,
            start_radius: -3.0,
            radius_lerp_speed: 0.0,
        }
        .sanitized();
        assert!(tuning.min_speed <= tuning.max_speed);
        assert!(tuning.start_radius >= 1.0);
        assert!(tuning.radius_lerp_speed >= 0.1);
    }
}
