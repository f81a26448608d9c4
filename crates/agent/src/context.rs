use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use optibot_core::domain::context::{CONTEXT_TTL_HOURS, HISTORY_LIMIT};
use optibot_core::{DialogueContext, Intent};

/// Partial update merged into a context. `None` fields are left untouched;
/// provided slots are merged key by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextUpdate {
    pub current_intent: Option<Intent>,
    pub slots: Option<HashMap<String, String>>,
}

/// Owned store of per-user dialogue state behind an async mutex. Individual
/// operations are serialized; whole turns are not, so two concurrent turns
/// for the same user resolve last-write-wins. Turns for different users
/// never block each other beyond the brief map lock.
pub struct ContextStore {
    history_limit: usize,
    ttl: Duration,
    inner: Mutex<HashMap<String, DialogueContext>>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::with_limits(HISTORY_LIMIT, CONTEXT_TTL_HOURS)
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(history_limit: usize, ttl_hours: i64) -> Self {
        Self {
            history_limit: history_limit.max(1),
            ttl: Duration::hours(ttl_hours.max(1)),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the user's context, creating it on first access. Every
    /// access bumps `updated_at`.
    pub async fn get(&self, user_id: &str) -> DialogueContext {
        self.get_at(user_id, Utc::now()).await
    }

    /// Merges the update, bumps `updated_at`, and runs the eviction sweep.
    /// The sweep is O(active users) per call; fine at this scale, a
    /// background reaper would replace it under real load.
    pub async fn update(&self, user_id: &str, update: ContextUpdate) -> DialogueContext {
        self.update_at(user_id, update, Utc::now()).await
    }

    pub async fn append_history(&self, user_id: &str, user_message: &str, bot_response: &str) {
        self.append_history_at(user_id, user_message, bot_response, Utc::now()).await;
    }

    pub async fn active_users(&self) -> usize {
        self.inner.lock().await.len()
    }

    async fn get_at(&self, user_id: &str, now: DateTime<Utc>) -> DialogueContext {
        let mut contexts = self.inner.lock().await;
        let context = contexts
            .entry(user_id.to_string())
            .or_insert_with(|| DialogueContext::new(user_id, now));
        context.updated_at = now;
        context.clone()
    }

    async fn update_at(
        &self,
        user_id: &str,
        update: ContextUpdate,
        now: DateTime<Utc>,
    ) -> DialogueContext {
        let mut contexts = self.inner.lock().await;
        let context = contexts
            .entry(user_id.to_string())
            .or_insert_with(|| DialogueContext::new(user_id, now));

        if let Some(intent) = update.current_intent {
            context.current_intent = Some(intent);
        }
        if let Some(slots) = update.slots {
            context.slots.extend(slots);
        }
        context.updated_at = now;
        let snapshot = context.clone();

        let ttl = self.ttl;
        contexts.retain(|_, candidate| !candidate.is_stale(now, ttl));

        snapshot
    }

    async fn append_history_at(
        &self,
        user_id: &str,
        user_message: &str,
        bot_response: &str,
        now: DateTime<Utc>,
    ) {
        let mut contexts = self.inner.lock().await;
        let context = contexts
            .entry(user_id.to_string())
            .or_insert_with(|| DialogueContext::new(user_id, now));
        context.push_history(user_message, bot_response, now, self.history_limit);
    }
}
