mod config;
mod game;
mod models;
mod routes;
mod session;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use config::Config;
use session::SessionStore;
use stats::StatsStore;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the background sweep checks for idle sessions and aged stats
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub stats: StatsStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sixtyseven_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting 67! backend server...");

    // Load configuration
    let config = Config::from_env()?;
    let rules = config.game_rules();
    tracing::info!(
        "Configuration loaded: {}x{} grid, target value {}",
        rules.rows,
        rules.cols,
        rules.target_value
    );

    // Create application state
    let state = Arc::new(AppState {
        sessions: SessionStore::with_seed(rules, config.game.seed),
        stats: StatsStore::new(),
        config: config.clone(),
    });

    // Spawn background task to expire idle sessions and purge aged stats
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        session_cleanup_task(cleanup_state).await;
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve frontend static files
    let frontend_service = ServeDir::new(&config.server.frontend_dir);

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .fallback_service(frontend_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Game frontend: http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// One cleanup sweep: expire idle sessions (recording still-in-progress
/// games as abandoned) and purge statistics rows past retention.
/// Returns (expired sessions, purged stats rows).
fn run_cleanup_sweep(state: &AppState) -> (usize, usize) {
    let expired = state
        .sessions
        .expire_idle(state.config.session_idle_timeout());
    let expired_count = expired.len();
    for (user_id, was_in_progress) in expired {
        if was_in_progress {
            state.stats.record_abandoned(&user_id);
        }
        tracing::info!("Expired idle session for user {}", user_id);
    }

    let purged = state.stats.purge_expired(state.config.stats_retention());
    if purged > 0 {
        tracing::info!("Purged {} statistics rows past retention", purged);
    }

    (expired_count, purged)
}

/// Background task that periodically runs the cleanup sweep
async fn session_cleanup_task(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);

    loop {
        interval.tick().await;
        run_cleanup_sweep(&state);
    }
}
