use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Direction, GameState, GameStatus, UserStats};
use crate::routes::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user_id: String,
    pub game: GameState,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_id: String,
    pub wins: u32,
    pub losses: u32,
    pub abandoned: u32,
}

impl From<UserStats> for StatsResponse {
    fn from(stats: UserStats) -> Self {
        StatsResponse {
            user_id: stats.user_id,
            wins: stats.wins,
            losses: stats.losses,
            abandoned: stats.abandoned,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub game: GameState,
    /// Whether the restart displaced a game that was still in progress.
    pub abandoned_previous: bool,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub game: GameState,
    pub moved: bool,
    pub score_delta: u64,
}

fn ensure_known_user(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    if state.stats.contains(user_id) {
        Ok(())
    } else {
        Err(ApiError::UnknownUser(user_id.to_string()))
    }
}

/// Mint a new user id, register a statistics row and deal the first game.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let user_id = Uuid::new_v4().to_string();
    state.stats.register(&user_id);
    let game = state.sessions.start_game(&user_id)?;

    tracing::info!("Created user {} with a fresh game", user_id);
    Ok(Json(CreateUserResponse { user_id, game }))
}

/// Lifetime win / loss / abandoned counters for a user.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state
        .stats
        .get(&user_id)
        .ok_or_else(|| ApiError::UnknownUser(user_id))?;
    Ok(Json(stats.into()))
}

/// Current game for this user, dealing a fresh one when none is live.
pub async fn get_or_start_game(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<GameState>, ApiError> {
    ensure_known_user(&state, &user_id)?;
    let game = state.sessions.get_or_start(&user_id)?;
    Ok(Json(game))
}

/// Replace the current game with a fresh one. An in-progress game that
/// gets thrown away this way counts as abandoned.
pub async fn restart_game(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<RestartResponse>, ApiError> {
    ensure_known_user(&state, &user_id)?;
    let (game, abandoned) = state.sessions.restart(&user_id)?;
    if abandoned {
        state.stats.record_abandoned(&user_id);
    }

    tracing::info!(
        "User {} restarted their game (abandoned previous: {})",
        user_id,
        abandoned
    );
    Ok(Json(RestartResponse {
        game,
        abandoned_previous: abandoned,
    }))
}

/// Apply one directional move to the user's game.
pub async fn make_move(
    State(state): State<Arc<AppState>>,
    Path((user_id, direction)): Path<(String, String)>,
) -> Result<Json<MoveResponse>, ApiError> {
    ensure_known_user(&state, &user_id)?;
    let direction: Direction = direction.parse()?;

    let result = state.sessions.apply_move(&user_id, direction)?;

    // A terminal status in an Ok result means this very move ended the
    // game: finished games reject further moves, so this records once.
    match result.state.status {
        GameStatus::Won => {
            state.stats.record_win(&user_id);
            tracing::info!("User {} won with score {}", user_id, result.state.score);
        }
        GameStatus::Lost => {
            state.stats.record_loss(&user_id);
            tracing::info!("User {} lost with score {}", user_id, result.state.score);
        }
        GameStatus::InProgress => {
            tracing::debug!(
                "User {} moved {} (changed board: {})",
                user_id,
                direction,
                result.moved
            );
        }
    }

    Ok(Json(MoveResponse {
        game: result.state,
        moved: result.moved,
        score_delta: result.score_delta,
    }))
}
