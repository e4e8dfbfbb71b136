use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime solo-game record for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub wins: u32,
    pub losses: u32,
    /// Games replaced by a restart (or expired) while still in progress.
    pub abandoned: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        UserStats {
            user_id: user_id.into(),
            wins: 0,
            losses: 0,
            abandoned: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_games(&self) -> u32 {
        self.wins + self.losses + self.abandoned
    }

    pub fn win_rate(&self) -> f32 {
        let total = self.total_games();
        if total == 0 {
            0.0
        } else {
            (self.wins as f32 / total as f32) * 100.0
        }
    }
}
