use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::game::{GameRules, SpawnPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory the static frontend is served from.
    pub frontend_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub target_value: i64,
    /// Merge results below this clamp to it; `None` keeps raw results.
    pub merge_floor: Option<i64>,
    pub initial_tiles: usize,
    pub tiles_per_move: usize,
    pub operator_rate: f32,
    /// Fixed RNG seed for reproducible games; unset means OS entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub stats_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a number")?,
            frontend_dir: env::var("FRONTEND_DIR").unwrap_or_else(|_| "../frontend".to_string()),
        };

        let merge_floor = match env::var("MERGE_FLOOR") {
            Ok(raw) if raw.eq_ignore_ascii_case("none") => None,
            Ok(raw) => Some(
                raw.parse()
                    .context("MERGE_FLOOR must be an integer or \"none\"")?,
            ),
            Err(_) => Some(0),
        };

        let seed = match env::var("GAME_SEED") {
            Ok(raw) => Some(raw.parse().context("GAME_SEED must be an unsigned integer")?),
            Err(_) => None,
        };

        let game = GameConfig {
            rows: env::var("GRID_ROWS")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            cols: env::var("GRID_COLS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            target_value: env::var("TARGET_VALUE")
                .unwrap_or_else(|_| "67".to_string())
                .parse()
                .unwrap_or(67),
            merge_floor,
            initial_tiles: env::var("INITIAL_TILES")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            tiles_per_move: env::var("TILES_PER_MOVE")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            operator_rate: env::var("OPERATOR_RATE")
                .unwrap_or_else(|_| "0.2".to_string())
                .parse()
                .unwrap_or(0.2),
            seed,
        };

        let session = SessionConfig {
            idle_timeout_secs: env::var("SESSION_IDLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("SESSION_IDLE_TIMEOUT_SECS must be a number")?,
            stats_retention_days: env::var("STATS_RETENTION_DAYS")
                .unwrap_or_else(|_| "730".to_string())
                .parse()
                .context("STATS_RETENTION_DAYS must be a number")?,
        };

        Ok(Config {
            server,
            game,
            session,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Engine rules assembled from the game section.
    pub fn game_rules(&self) -> GameRules {
        GameRules {
            rows: self.game.rows,
            cols: self.game.cols,
            target_value: self.game.target_value,
            merge_floor: self.game.merge_floor,
            spawn: SpawnPolicy {
                initial_tiles: self.game.initial_tiles,
                tiles_per_move: self.game.tiles_per_move,
                operator_rate: self.game.operator_rate,
                ..SpawnPolicy::default()
            },
        }
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    pub fn stats_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.stats_retention_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                frontend_dir: "../frontend".to_string(),
            },
            game: GameConfig {
                rows: 6,
                cols: 7,
                target_value: 67,
                merge_floor: Some(0),
                initial_tiles: 4,
                tiles_per_move: 1,
                operator_rate: 0.2,
                seed: Some(1),
            },
            session: SessionConfig {
                idle_timeout_secs: 86_400,
                stats_retention_days: 730,
            },
        }
    }

    #[test]
    fn test_server_addr_format() {
        assert_eq!(sample_config().server_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_game_rules_mirror_the_game_section() {
        let rules = sample_config().game_rules();
        assert_eq!(rules.rows, 6);
        assert_eq!(rules.cols, 7);
        assert_eq!(rules.target_value, 67);
        assert_eq!(rules.merge_floor, Some(0));
        assert_eq!(rules.spawn.initial_tiles, 4);
        assert_eq!(rules.spawn.tiles_per_move, 1);
        assert_eq!(rules.spawn.operator_rate, 0.2);
    }

    #[test]
    fn test_durations_derived_from_session_section() {
        let config = sample_config();
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(86_400));
        assert_eq!(config.stats_retention(), chrono::Duration::days(730));
    }
}
