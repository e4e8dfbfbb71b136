pub mod game;
pub mod tile;
pub mod user;

pub use game::{Direction, GameState, GameStatus, Grid, ParseDirectionError};
pub use tile::{Op, Tile};
pub use user::UserStats;
