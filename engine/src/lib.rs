pub mod board;
pub mod cave;
pub mod geom;
pub mod overlay;
pub mod region;

pub use board::{Board, Cell, CellState, GridPos, OverlayKind};
pub use cave::{BBox, Cave, CaveParams};
pub use geom::{Penetration, Rect, Segment, Vec2};
pub use overlay::{Corner, PartitionCell};
pub use region::Region;

/// Seam between a game's pure simulation state and whatever drives it
/// (a windowed frontend, a replay file, or a test harness).
pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &mut Self::State, input: Self::Input);
}

/// Drives a [`GameLogic`] without any frontend: feed inputs, inspect
/// state. Scenario tests use this to play whole sessions deterministically.
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    state: G::State,
    frame: usize,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G) -> Self {
        let state = game.initial_state();
        Self {
            game,
            state,
            frame: 0,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn state(&self) -> &G::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut G::State {
        &mut self.state
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        self.game.step(&mut self.state, input);
        self.frame += 1;
        self.frame
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last = self.frame;
        for input in inputs {
            last = self.step(input);
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Additive;

    impl GameLogic for Additive {
        type State = i32;
        type Input = i32;

        fn initial_state(&self) -> Self::State {
            0
        }

        fn step(&self, state: &mut Self::State, input: Self::Input) {
            *state += input;
        }
    }

    #[test]
    fn runner_steps_and_counts_frames() {
        let mut runner = HeadlessRunner::new(Additive);
        runner.run([1, 2, 3]);
        assert_eq!(runner.frame(), 3);
        assert_eq!(runner.state(), &6);
    }
}
