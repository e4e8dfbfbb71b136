// Grid engine modules

pub mod engine;
pub mod spawner;

pub use engine::{EngineError, GameEngine, GameRules, MoveOutcome};
pub use spawner::{SpawnPolicy, TileSpawner};
