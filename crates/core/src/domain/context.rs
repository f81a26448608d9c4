use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::intent::Intent;

pub const HISTORY_LIMIT: usize = 50;
pub const CONTEXT_TTL_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_message: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user dialogue state. Created lazily on first access, mutated on every
/// turn, evicted once `updated_at` falls behind the retention window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
    pub current_intent: Option<Intent>,
    pub slots: HashMap<String, String>,
}

impl DialogueContext {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            current_intent: None,
            slots: HashMap::new(),
        }
    }

    /// Appends a turn and trims to the most recent `limit` entries,
    /// oldest dropped first.
    pub fn push_history(
        &mut self,
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        now: DateTime<Utc>,
        limit: usize,
    ) {
        self.history.push(HistoryEntry {
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            timestamp: now,
        });
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
        self.updated_at = now;
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.updated_at > ttl
    }
}
