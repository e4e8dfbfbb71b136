pub mod health;
pub mod solo;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::models::ParseDirectionError;
use crate::session::SessionError;
use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", axum::routing::post(solo::create_user))
        .route("/users/{user_id}/stats", get(solo::get_stats))
        .route("/users/{user_id}/solo", get(solo::get_or_start_game))
        .route(
            "/users/{user_id}/solo/restart",
            axum::routing::post(solo::restart_game),
        )
        .route(
            "/users/{user_id}/solo/moves/{direction}",
            axum::routing::post(solo::make_move),
        )
}

/// Errors crossing the HTTP boundary. Every variant maps to a status code
/// and a stable machine-readable code in the JSON body:
/// `{ "error": <code>, "message": <text> }`.
#[derive(Debug)]
pub enum ApiError {
    NoActiveGame,
    GameOver,
    InvalidDirection(String),
    UnknownUser(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoActiveGame => StatusCode::NOT_FOUND,
            ApiError::GameOver => StatusCode::CONFLICT,
            ApiError::InvalidDirection(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownUser(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NoActiveGame => "no_active_game",
            ApiError::GameOver => "game_over",
            ApiError::InvalidDirection(_) => "invalid_direction",
            ApiError::UnknownUser(_) => "unknown_user",
            ApiError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NoActiveGame => "no active game for this user".to_string(),
            ApiError::GameOver => "game is already over".to_string(),
            ApiError::InvalidDirection(raw) => format!("invalid direction: {:?}", raw),
            ApiError::UnknownUser(user_id) => format!("unknown user: {}", user_id),
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref detail) = self {
            tracing::error!("Internal error while serving request: {}", detail);
        }
        let body = json!({
            "error": self.code(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoActiveGame => ApiError::NoActiveGame,
            SessionError::GameOver => ApiError::GameOver,
            SessionError::Engine(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<ParseDirectionError> for ApiError {
    fn from(err: ParseDirectionError) -> Self {
        ApiError::InvalidDirection(err.0)
    }
}
