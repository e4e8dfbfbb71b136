use chrono::{Duration, Utc};
use dashmap::DashMap;

use crate::models::UserStats;

/// In-memory statistics registry: win / loss / abandoned counters per user.
///
/// Durable storage sits outside this process; the registry is the in-process
/// record the HTTP layer reads and updates.
pub struct StatsStore {
    users: DashMap<String, UserStats>,
}

impl StatsStore {
    pub fn new() -> Self {
        StatsStore {
            users: DashMap::new(),
        }
    }

    /// Create the row for a user, keeping an existing one untouched.
    pub fn register(&self, user_id: &str) -> UserStats {
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| UserStats::new(user_id))
            .clone()
    }

    pub fn get(&self, user_id: &str) -> Option<UserStats> {
        self.users.get(user_id).map(|stats| stats.clone())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn record_win(&self, user_id: &str) -> UserStats {
        self.bump(user_id, |stats| stats.wins += 1)
    }

    pub fn record_loss(&self, user_id: &str) -> UserStats {
        self.bump(user_id, |stats| stats.losses += 1)
    }

    pub fn record_abandoned(&self, user_id: &str) -> UserStats {
        self.bump(user_id, |stats| stats.abandoned += 1)
    }

    fn bump(&self, user_id: &str, update: impl FnOnce(&mut UserStats)) -> UserStats {
        let mut entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserStats::new(user_id));
        update(&mut entry);
        entry.updated_at = Utc::now();
        entry.clone()
    }

    /// Drop rows created longer ago than `retention`. Returns how many went.
    pub fn purge_expired(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let before = self.users.len();
        self.users.retain(|_, stats| stats.created_at >= cutoff);
        before.saturating_sub(self.users.len())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}
