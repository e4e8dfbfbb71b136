use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::game::{EngineError, GameEngine, GameRules};
use crate::models::{Direction, GameState, GameStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active game for this user")]
    NoActiveGame,
    #[error("game is already over")]
    GameOver,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One user's live game plus the RNG driving its spawns.
struct GameSession {
    state: GameState,
    rng: StdRng,
    last_activity: Instant,
}

/// What the session layer reports back for one move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub state: GameState,
    pub moved: bool,
    pub score_delta: u64,
}

/// Per-user store of live games. At most one game per user id; the map's
/// per-key guards serialize concurrent operations on the same user while
/// different users proceed in parallel.
pub struct SessionStore {
    games: DashMap<String, GameSession>,
    engine: GameEngine,
    seed: Option<u64>,
}

impl SessionStore {
    pub fn new(rules: GameRules) -> Self {
        Self::with_seed(rules, None)
    }

    /// A fixed seed makes every new session's spawn sequence reproducible.
    pub fn with_seed(rules: GameRules, seed: Option<u64>) -> Self {
        SessionStore {
            games: DashMap::new(),
            engine: GameEngine::new(rules),
            seed,
        }
    }

    pub fn rules(&self) -> &GameRules {
        self.engine.rules()
    }

    fn new_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn fresh_session(&self) -> Result<GameSession, SessionError> {
        let mut rng = self.new_rng();
        let grid = self.engine.spawn_initial(&mut rng)?;
        let status = self.engine.status(&grid);
        Ok(GameSession {
            state: GameState {
                grid,
                score: 0,
                round: 1,
                status,
            },
            rng,
            last_activity: Instant::now(),
        })
    }

    /// Start a fresh game, replacing any existing one.
    pub fn start_game(&self, user_id: &str) -> Result<GameState, SessionError> {
        let session = self.fresh_session()?;
        let state = session.state.clone();
        self.games.insert(user_id.to_string(), session);
        tracing::debug!("Started new game for user {}", user_id);
        Ok(state)
    }

    /// Current game for this user, starting one atomically when absent.
    pub fn get_or_start(&self, user_id: &str) -> Result<GameState, SessionError> {
        match self.games.entry(user_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().state.clone()),
            Entry::Vacant(entry) => {
                let session = self.fresh_session()?;
                let state = session.state.clone();
                entry.insert(session);
                tracing::debug!("Started new game for user {}", user_id);
                Ok(state)
            }
        }
    }

    /// Start a fresh game and report whether it displaced one that was
    /// still in progress (the abandoned-game case). With no prior game
    /// this is just a start.
    pub fn restart(&self, user_id: &str) -> Result<(GameState, bool), SessionError> {
        let session = self.fresh_session()?;
        let state = session.state.clone();
        let displaced = self.games.insert(user_id.to_string(), session);
        let abandoned = displaced
            .map(|old| old.state.status == GameStatus::InProgress)
            .unwrap_or(false);
        tracing::debug!(
            "Restarted game for user {} (abandoned in-progress: {})",
            user_id,
            abandoned
        );
        Ok((state, abandoned))
    }

    pub fn get_state(&self, user_id: &str) -> Result<GameState, SessionError> {
        self.games
            .get(user_id)
            .map(|session| session.state.clone())
            .ok_or(SessionError::NoActiveGame)
    }

    pub fn has_game(&self, user_id: &str) -> bool {
        self.games.contains_key(user_id)
    }

    /// Resolve one move for this user's game.
    ///
    /// The exclusive map guard covers the whole read-modify-write, so two
    /// concurrent moves for the same user can never interleave. Score,
    /// round and status only advance when the board actually changed.
    pub fn apply_move(
        &self,
        user_id: &str,
        direction: Direction,
    ) -> Result<MoveResult, SessionError> {
        let mut session = self
            .games
            .get_mut(user_id)
            .ok_or(SessionError::NoActiveGame)?;
        if session.state.status.is_terminal() {
            return Err(SessionError::GameOver);
        }

        let session = &mut *session;
        let outcome = self
            .engine
            .apply_move(&session.state.grid, direction, &mut session.rng);

        if outcome.moved {
            session.state.grid = outcome.grid;
            session.state.score += outcome.score_delta;
            session.state.round += 1;
            session.state.status = self.engine.status(&session.state.grid);
        }
        session.last_activity = Instant::now();

        Ok(MoveResult {
            state: session.state.clone(),
            moved: outcome.moved,
            score_delta: outcome.score_delta,
        })
    }

    /// Reinstall a state that lived outside the store. The session gets a
    /// fresh RNG and activity timestamp; the state is trusted as-is.
    pub fn restore_game(&self, user_id: &str, state: GameState) {
        self.games.insert(
            user_id.to_string(),
            GameSession {
                state,
                rng: self.new_rng(),
                last_activity: Instant::now(),
            },
        );
    }

    pub fn remove(&self, user_id: &str) -> Option<GameState> {
        self.games.remove(user_id).map(|(_, session)| session.state)
    }

    /// Remove sessions idle beyond `ttl`. Returns the removed user ids,
    /// each paired with whether the expiring game was still in progress.
    pub fn expire_idle(&self, ttl: Duration) -> Vec<(String, bool)> {
        let now = Instant::now();
        let mut candidates = Vec::new();
        for entry in self.games.iter() {
            if now.duration_since(entry.last_activity) > ttl {
                candidates.push(entry.key().clone());
            }
        }

        let mut removed = Vec::new();
        for user_id in candidates {
            // Re-check under the key guard: the session may have seen
            // activity between the scan and the removal.
            if let Some((_, session)) = self
                .games
                .remove_if(&user_id, |_, s| now.duration_since(s.last_activity) > ttl)
            {
                let in_progress = session.state.status == GameStatus::InProgress;
                removed.push((user_id, in_progress));
            }
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.games.len()
    }
}
