use std::collections::HashMap;

use engine::geom::Vec2;
use engine::{Board, Cave, CaveParams, Corner, GridPos, PartitionCell, Region};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureOutcome, LevelClearReason};
use crate::enemy::{Enemy, EnemyKind};
use crate::level::LevelConfig;
use crate::trail::{CaptureState, Fuse, Trail, TrailPoint};

pub const SIM_FPS: u32 = 30;
/// Fixed simulation tick in seconds.
pub const TICK: f64 = 1.0 / SIM_FPS as f64;
pub const PLAYER_SPEED: f64 = 120.0;
pub const STARTING_LIVES: u32 = 3;
/// Score per newly claimed cell before multipliers.
pub const CELL_SCORE: u32 = 10;
/// Bonus per destroyed obstacle cell.
pub const OBSTACLE_CELL_BONUS: u32 = 50;

const PLAYER_RADIUS_CELLS: f64 = 0.4;
const ENEMY_RESIZE_INTERVAL: f64 = 0.25;
const SPAWN_ATTEMPTS: usize = 50;
/// Minimum spawn distance from the player, in cells.
const SPAWN_CLEARANCE_CELLS: f64 = 3.0;

/// Cave detection tuned for gameplay: pockets as small as two cells
/// matter, and deep concave rooms need more peel steps than the library
/// default allows.
pub(crate) fn cave_params() -> CaveParams {
    CaveParams {
        min_size: 2,
        max_erosion_steps: 20,
        ..CaveParams::default()
    }
}

/// xorshift64*; deterministic for a given seed so whole sessions replay
/// exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub(crate) fn range_usize(&mut self, n: usize) -> usize {
        (self.next_u64() % n.max(1) as u64) as usize
    }

    pub(crate) fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

/// One tick of player intent. `dir` is a desired direction (normalized
/// internally); `slow` requests half-speed capture for the doubled score
/// multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub dir: Vec2,
    pub slow: bool,
}

impl StepInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn moving(x: f64, y: f64) -> Self {
        Self {
            dir: Vec2::new(x, y),
            slow: false,
        }
    }

    pub fn slow(x: f64, y: f64) -> Self {
        Self {
            dir: Vec2::new(x, y),
            slow: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub radius: f64,
}

/// One full game session: the board, its inhabitants, the trail machine
/// and the scoring shell. All mutation goes through [`Session::step`] and
/// the level-transition helpers, driven at a fixed tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub(crate) board: Board,
    pub(crate) level: LevelConfig,
    pub(crate) player: Player,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) trail: Trail,
    pub(crate) fuse: Fuse,
    pub(crate) state: CaptureState,
    /// Whether the current trail was walked in slow mode throughout.
    pub(crate) capture_slow: bool,
    pub(crate) score: u32,
    pub(crate) high_score: u32,
    pub(crate) lives: u32,
    pub(crate) combo_multiplier: u32,
    pub(crate) percent: f64,
    pub(crate) level_clear: Option<LevelClearReason>,
    pub(crate) game_over: bool,
    pub(crate) last_outcome: Option<CaptureOutcome>,
    pub(crate) corners: Vec<Corner>,
    pub(crate) partition_cells: Vec<PartitionCell>,
    pub(crate) caves: Vec<Cave>,
    pub(crate) rng: Rng,
    death_nearest: bool,
    resize_timer: f64,
}

impl Session {
    pub fn new(config: LevelConfig, seed: u64) -> Self {
        let level = config.sanitized();
        let board = level.build_board();
        let player = Player {
            pos: Vec2::ZERO,
            radius: PLAYER_RADIUS_CELLS * board.cell_size(),
        };
        let mut session = Self {
            board,
            level,
            player,
            enemies: Vec::new(),
            trail: Trail::new(),
            fuse: Fuse::default(),
            state: CaptureState::Idle,
            capture_slow: false,
            score: 0,
            high_score: 0,
            lives: STARTING_LIVES,
            combo_multiplier: 1,
            percent: 0.0,
            level_clear: None,
            game_over: false,
            last_outcome: None,
            corners: Vec::new(),
            partition_cells: Vec::new(),
            caves: Vec::new(),
            rng: Rng::new(seed),
            death_nearest: false,
            resize_timer: 0.0,
        };
        session.player.pos = session.default_spawn();
        session.spawn_initial_enemies();
        session.update_percent();
        session
    }

    /// Begin a new level with the given config, keeping score, high score
    /// and remaining lives.
    pub fn start_level(&mut self, config: LevelConfig) {
        self.level = config.sanitized();
        self.board = self.level.build_board();
        self.player.radius = PLAYER_RADIUS_CELLS * self.board.cell_size();
        self.player.pos = self.default_spawn();
        self.enemies.clear();
        self.trail.clear();
        self.fuse.reset();
        self.state = CaptureState::Idle;
        self.capture_slow = false;
        self.combo_multiplier = 1;
        self.percent = 0.0;
        self.level_clear = None;
        self.last_outcome = None;
        self.corners.clear();
        self.partition_cells.clear();
        self.caves.clear();
        self.resize_timer = 0.0;
        self.spawn_initial_enemies();
        self.update_percent();
    }

    /// Replay the current level config from scratch.
    pub fn restart_level(&mut self) {
        let level = self.level.clone();
        self.start_level(level);
    }

    /// Advance one fixed tick. No-op once the level is cleared or the
    /// session is over; a pending death resolves first.
    pub fn step(&mut self, input: StepInput) {
        if self.game_over || self.level_clear.is_some() {
            return;
        }
        if self.state == CaptureState::Dead {
            self.resolve_death();
            return;
        }

        if let Some(nearest) = self.step_player(input) {
            self.kill_player(nearest);
            return;
        }

        if self.state == CaptureState::Fusing
            && self.fuse.tick_burn(TICK, self.trail.segment_count())
        {
            self.kill_player(false);
            return;
        }

        if let Some(nearest) = self.step_enemies() {
            self.kill_player(nearest);
            return;
        }

        self.resize_timer += TICK;
        if self.resize_timer >= ENEMY_RESIZE_INTERVAL {
            self.resize_timer = 0.0;
            self.update_enemy_sizes();
        }
    }

    /// Move the player and drive the trail machine. Returns
    /// `Some(nearest_respawn)` when the tick kills the player.
    fn step_player(&mut self, input: StepInput) -> Option<bool> {
        let dir = input.dir.normalized();
        if dir == Vec2::ZERO {
            if self.state == CaptureState::Capturing && self.fuse.tick_idle(TICK) {
                self.state = CaptureState::Fusing;
            }
            return None;
        }

        self.fuse.note_movement();
        if self.state == CaptureState::Fusing {
            self.state = CaptureState::Capturing;
        }

        let speed = if input.slow && self.state != CaptureState::Idle {
            PLAYER_SPEED / 2.0
        } else {
            PLAYER_SPEED
        };
        let mut next = self.player.pos + dir * (speed * TICK);
        let max_x = self.board.cols() as f64 * self.board.cell_size();
        let max_y = self.board.rows() as f64 * self.board.cell_size();
        next.x = next.x.clamp(0.0, max_x);
        next.y = next.y.clamp(0.0, max_y);

        let cell = self.board.cell_for(next);
        if self.board.is_obstacle(cell) {
            // obstacles block movement outright
            return None;
        }
        self.player.pos = next;

        if self.board.is_empty(cell) {
            match self.state {
                CaptureState::Idle => {
                    self.trail.start(TrailPoint { pos: next, cell });
                    self.state = CaptureState::Capturing;
                    self.capture_slow = input.slow;
                }
                CaptureState::Capturing => {
                    if self.trail.last().map(|p| p.cell) != Some(cell) {
                        if self.trail.try_extend(TrailPoint { pos: next, cell }).is_err() {
                            return Some(true);
                        }
                        if !input.slow {
                            self.capture_slow = false;
                        }
                    }
                }
                CaptureState::Fusing | CaptureState::Dead => {}
            }
        } else if self.board.is_filled(cell) && self.state == CaptureState::Capturing {
            let outcome = self.finalize_capture();
            self.last_outcome = Some(outcome);
        }

        None
    }

    /// Integrate all enemies and resolve their contacts. Returns
    /// `Some(nearest_respawn)` when a contact kills the player.
    fn step_enemies(&mut self) -> Option<bool> {
        let capturing =
            matches!(self.state, CaptureState::Capturing | CaptureState::Fusing);
        let player_pos = self.player.pos;
        let player_radius = self.player.radius;
        let mut death: Option<bool> = None;

        for enemy in &mut self.enemies {
            enemy.integrate(TICK, &self.board);
            enemy.approach_target_radius(TICK);

            if capturing {
                if let Some(contact) = enemy.trail_contact(&self.trail) {
                    enemy.bounce(contact.normal);
                    death.get_or_insert(true);
                }
            }

            if enemy.overlaps_circle(player_pos, player_radius) {
                if capturing {
                    death = Some(false);
                } else {
                    // player stands on claimed ground: shove the enemy off
                    let away = (enemy.pos - player_pos).normalized();
                    if away != Vec2::ZERO {
                        enemy.bounce(away);
                    }
                }
            }
        }

        death
    }

    fn kill_player(&mut self, nearest: bool) {
        self.state = CaptureState::Dead;
        self.death_nearest = nearest;
        self.trail.clear();
        self.fuse.reset();
        self.capture_slow = false;
    }

    fn resolve_death(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
            return;
        }
        let anchor = if self.death_nearest {
            self.player.pos
        } else {
            self.default_spawn()
        };
        self.player.pos = self
            .board
            .find_nearest_filled_cell(anchor)
            .unwrap_or_else(|| self.default_spawn());
        self.combo_multiplier = 1;
        self.state = CaptureState::Idle;
    }

    /// Bottom-center border cell.
    fn default_spawn(&self) -> Vec2 {
        self.board
            .world_for_cell(GridPos::new(self.board.rows() - 1, self.board.cols() / 2))
    }

    fn spawn_initial_enemies(&mut self) {
        self.spawn_enemy(EnemyKind::Main);
        for _ in 0..self.level.minion_count {
            self.spawn_enemy(EnemyKind::Minion);
        }
    }

    pub(crate) fn spawn_enemy(&mut self, kind: EnemyKind) {
        let mut pos = self
            .random_empty_point()
            .unwrap_or_else(|| self.board_center());

        // nudge fresh arrivals out of the player's lap
        let clearance = SPAWN_CLEARANCE_CELLS * self.board.cell_size();
        let away = pos - self.player.pos;
        if away.length() < clearance {
            let dir = if away == Vec2::ZERO {
                Vec2::new(0.0, -1.0)
            } else {
                away.normalized()
            };
            pos = pos + dir * clearance;
            let max_x = self.board.cols() as f64 * self.board.cell_size();
            let max_y = self.board.rows() as f64 * self.board.cell_size();
            pos.x = pos.x.clamp(0.0, max_x);
            pos.y = pos.y.clamp(0.0, max_y);
        }

        let angle = self.rng.range_f64(0.0, std::f64::consts::TAU);
        let speed = self
            .rng
            .range_f64(self.level.enemy.min_speed, self.level.enemy.max_speed);
        let vel = Vec2::new(angle.cos(), angle.sin()) * speed;
        self.enemies.push(Enemy::new(kind, pos, vel, &self.level.enemy));
    }

    fn random_empty_point(&mut self) -> Option<Vec2> {
        for _ in 0..SPAWN_ATTEMPTS {
            let r = 1 + self.rng.range_usize(self.board.rows() - 2);
            let c = 1 + self.rng.range_usize(self.board.cols() - 2);
            let pos = GridPos::new(r, c);
            if self.board.is_empty(pos) {
                return Some(self.board.world_for_cell(pos));
            }
        }
        None
    }

    fn board_center(&self) -> Vec2 {
        Vec2::new(
            self.board.cols() as f64 * self.board.cell_size() / 2.0,
            self.board.rows() as f64 * self.board.cell_size() / 2.0,
        )
    }

    /// Retarget every enemy's size from its occupancy: the cell count of
    /// its cave when it sits in one, otherwise of its open region, scaled
    /// against all currently Empty cells.
    pub(crate) fn update_enemy_sizes(&mut self) {
        let regions = self.board.flood_fill_regions();
        let total_empty: usize = regions.iter().map(Region::len).sum();
        if total_empty == 0 {
            return;
        }

        let mut region_size: HashMap<GridPos, usize> = HashMap::new();
        for region in &regions {
            for &cell in &region.cells {
                region_size.insert(cell, region.len());
            }
        }

        for enemy in &mut self.enemies {
            let cell = self.board.cell_for(enemy.pos);
            let occupied = self
                .board
                .cave_id(cell)
                .and_then(|id| self.caves.iter().find(|cave| cave.id == id))
                .map(|cave| cave.cells.len())
                .or_else(|| region_size.get(&cell).copied())
                .unwrap_or(0);
            let ratio = occupied as f64 / total_empty as f64;
            enemy.target_radius = (3.0 + ratio * 30.0).floor().max(3.0);
        }
    }

    /// Recompute the claimed percentage over interior non-obstacle cells
    /// and raise the goal signal when the threshold is met.
    pub(crate) fn update_percent(&mut self) {
        let mut filled = 0usize;
        let mut claimable = 0usize;
        for pos in self.board.positions() {
            if self.board.on_border(pos) {
                continue;
            }
            if self.board.is_obstacle(pos) {
                continue;
            }
            claimable += 1;
            if self.board.is_filled(pos) {
                filled += 1;
            }
        }
        self.percent = if claimable == 0 {
            100.0
        } else {
            filled as f64 / claimable as f64 * 100.0
        };
        if self.percent >= self.level.capture_goal_percent && self.level_clear.is_none() {
            self.level_clear = Some(LevelClearReason::PercentGoal);
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn fuse(&self) -> &Fuse {
        &self.fuse
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn combo_multiplier(&self) -> u32 {
        self.combo_multiplier
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn level_clear(&self) -> Option<LevelClearReason> {
        self.level_clear
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn last_outcome(&self) -> Option<&CaptureOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    pub fn partition_cells(&self) -> &[PartitionCell] {
        &self.partition_cells
    }

    pub fn caves(&self) -> &[Cave] {
        &self.caves
    }
}
