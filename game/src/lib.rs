pub mod capture;
pub mod enemy;
pub mod level;
pub mod playtest;
pub mod session;
pub mod sim;
pub mod trail;

pub use capture::{CaptureOutcome, LevelClearReason};
pub use enemy::{Enemy, EnemyKind, EnemyTuning};
pub use level::{LevelConfig, ObstacleRect};
pub use playtest::CaptureLogic;
pub use session::{Player, Session, StepInput};
pub use sim::FixedStep;
pub use trail::{CaptureState, Fuse, Trail, TrailPoint};
