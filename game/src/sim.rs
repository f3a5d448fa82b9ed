use std::time::Duration;

use crate::session::SIM_FPS;

/// How many ticks of backlog a stalled frontend may accumulate before the
/// remainder is dropped. Keeps a long pause from triggering a catch-up
/// spiral.
const MAX_BACKLOG_TICKS: u32 = 8;

/// Fixed-timestep accumulator: wall-clock time goes in, a whole number of
/// simulation ticks comes out, and the fractional remainder carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStep {
    tick: Duration,
    accumulator: Duration,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::with_tick(Duration::from_secs(1) / SIM_FPS)
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick,
            accumulator: Duration::ZERO,
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Feed elapsed wall-clock time; returns how many ticks to simulate.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator = (self.accumulator + elapsed).min(self.tick * MAX_BACKLOG_TICKS);
        let mut ticks = 0;
        while self.accumulator >= self.tick {
            self.accumulator -= self.tick;
            ticks += 1;
        }
        ticks
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ticks_carry_over() {
        let mut step = FixedStep::with_tick(Duration::from_millis(100));
        assert_eq!(step.advance(Duration::from_millis(60)), 0);
        assert_eq!(step.advance(Duration::from_millis(60)), 1);
        assert_eq!(step.advance(Duration::from_millis(380)), 4);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut step = FixedStep::with_tick(Duration::from_millis(100));
        assert_eq!(step.advance(Duration::from_secs(60)), MAX_BACKLOG_TICKS);
        // backlog was dropped, not deferred
        assert_eq!(step.advance(Duration::ZERO), 0);
    }

    #[test]
    fn default_matches_simulation_rate() {
        let step = FixedStep::new();
        assert_eq!(step.tick(), Duration::from_secs(1) / SIM_FPS);
    }
}
