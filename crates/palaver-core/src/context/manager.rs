//! Context manager bounding per-(user, channel) conversation state.

use chrono::{Duration, Utc};
use std::collections::HashMap;

use crate::config::ContextConfig;
use crate::types::{format_turns, ApiMessage, MessageRole, Turn};

use super::record::ConversationRecord;

/// Bounds and serves per-(user, channel) conversation state.
///
/// Conversations are keyed `"{channel_id}:{user_id}"`, capped at
/// `max_messages` turns (oldest trimmed first), and expire after
/// `expiry_minutes` of inactivity. Expired records are deleted on read or
/// by a caller-driven [`ContextManager::cleanup_expired`] sweep. All
/// mutation is synchronous and local; single-writer semantics are assumed.
pub struct ContextManager {
    max_messages: usize,
    expiry_minutes: i64,
    conversations: HashMap<String, ConversationRecord>,
}

impl ContextManager {
    /// Create a manager from configuration.
    pub fn new(config: &ContextConfig) -> Self {
        Self::with_limits(config.max_messages, config.expiry_minutes)
    }

    /// Create a manager with explicit limits.
    pub fn with_limits(max_messages: usize, expiry_minutes: i64) -> Self {
        tracing::debug!(
            "context manager initialized with max_messages={}, expiry_minutes={}",
            max_messages,
            expiry_minutes
        );
        Self {
            max_messages,
            expiry_minutes,
            conversations: HashMap::new(),
        }
    }

    fn conversation_id(user_id: &str, channel_id: &str) -> String {
        format!("{}:{}", channel_id, user_id)
    }

    /// Append a turn to a conversation, creating the record on first use.
    ///
    /// The role is `assistant` when `is_bot` is set, `user` otherwise. If
    /// the cap is exceeded the single oldest turn is trimmed. Any string
    /// input is accepted, including empty text.
    pub fn add_message(&mut self, user_id: &str, channel_id: &str, text: &str, is_bot: bool) {
        let id = Self::conversation_id(user_id, channel_id);
        let record = self
            .conversations
            .entry(id.clone())
            .or_insert_with(|| ConversationRecord::new(id));

        let role = if is_bot {
            MessageRole::Assistant
        } else {
            MessageRole::User
        };
        record.push_turn(Turn::new(role, text));

        if record.len() > self.max_messages {
            record.trim_oldest();
        }
    }

    /// Get the stored history for a conversation.
    ///
    /// Returns an empty list when the record is missing; an expired record
    /// is deleted and reported as empty. A successful read refreshes the
    /// record's recency.
    pub fn get_conversation_history(&mut self, user_id: &str, channel_id: &str) -> Vec<Turn> {
        let id = Self::conversation_id(user_id, channel_id);

        let expired = match self.conversations.get(&id) {
            None => {
                tracing::debug!("conversation {} not found", id);
                return Vec::new();
            }
            Some(record) => Self::is_expired(record, self.expiry_minutes),
        };

        if expired {
            tracing::debug!("conversation {} has expired", id);
            self.conversations.remove(&id);
            return Vec::new();
        }

        match self.conversations.get_mut(&id) {
            Some(record) => {
                record.touch();
                record.turns().to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Get the history formatted for a model API call, plus a
    /// human-readable debug rendering.
    pub fn get_formatted_history(
        &mut self,
        user_id: &str,
        channel_id: &str,
    ) -> (Vec<ApiMessage>, String) {
        let history = self.get_conversation_history(user_id, channel_id);

        let api_messages = history.iter().map(ApiMessage::from).collect();
        let debug_history = format_turns(&history);

        (api_messages, debug_history)
    }

    /// Delete a conversation unconditionally. No-op when absent.
    pub fn clear_conversation(&mut self, user_id: &str, channel_id: &str) {
        let id = Self::conversation_id(user_id, channel_id);
        self.conversations.remove(&id);
        tracing::debug!("conversation {} cleared", id);
    }

    /// Delete every expired conversation and return how many were removed.
    ///
    /// Intended to be run periodically by the caller; the manager does not
    /// schedule sweeps itself.
    pub fn cleanup_expired(&mut self) -> usize {
        let expiry_minutes = self.expiry_minutes;
        let before = self.conversations.len();
        self.conversations
            .retain(|_, record| !Self::is_expired(record, expiry_minutes));
        let removed = before - self.conversations.len();
        tracing::debug!("cleaned up {} expired conversations", removed);
        removed
    }

    /// Number of live conversations.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    fn is_expired(record: &ConversationRecord, expiry_minutes: i64) -> bool {
        Utc::now() > record.last_updated() + Duration::seconds(expiry_minutes * 60)
    }

    #[cfg(test)]
    fn backdate(&mut self, user_id: &str, channel_id: &str, secs: i64) {
        let id = Self::conversation_id(user_id, channel_id);
        if let Some(record) = self.conversations.get_mut(&id) {
            record.backdate(secs);
        }
    }
}
