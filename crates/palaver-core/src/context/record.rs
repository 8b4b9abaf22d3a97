//! Per-conversation turn history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ApiMessage, MessageRole, Turn};

/// Ordered, timestamped turn history for one conversation.
///
/// Turns are append-only in normal operation; the only removal paths are
/// head trims when a cap is exceeded, `clear`, and destruction of the
/// whole record by its owning manager. `last_updated` is monotonically
/// non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    id: String,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    /// Creation order within the owning manager, used as the deterministic
    /// eviction tie-break.
    #[serde(default)]
    seq: u64,
}

/// Summary statistics for a conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub conversation_id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub duration_secs: i64,
    pub user_messages: usize,
    pub assistant_messages: usize,
}

impl ConversationRecord {
    /// Create an empty record.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        let id = id.into();
        tracing::debug!("conversation record created for {}", id);
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            last_updated: now,
            seq: 0,
        }
    }

    pub(crate) fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Append a turn with a string role tag. Unknown tags coerce to `user`.
    pub fn add_message(&mut self, role: &str, content: impl Into<String>) {
        let role = MessageRole::coerce(role);
        self.push_turn(Turn::new(role, content));
    }

    /// Append a turn and refresh `last_updated`.
    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.last_updated = Utc::now();
        tracing::debug!(
            "turn added to conversation {}, total: {}",
            self.id,
            self.turns.len()
        );
    }

    /// Remove and return the oldest turn, if any.
    pub(crate) fn trim_oldest(&mut self) -> Option<Turn> {
        if self.turns.is_empty() {
            None
        } else {
            Some(self.turns.remove(0))
        }
    }

    /// Refresh `last_updated` without mutating turns (read-touch).
    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Get the stored turns, optionally limited to the most recent `limit`.
    pub fn get_messages(&self, limit: Option<usize>) -> &[Turn] {
        match limit {
            Some(n) if n < self.turns.len() => &self.turns[self.turns.len() - n..],
            _ => &self.turns,
        }
    }

    /// Get the turns projected for a model API call.
    pub fn formatted_messages(&self) -> Vec<ApiMessage> {
        self.turns.iter().map(ApiMessage::from).collect()
    }

    /// Get the most recent turn.
    pub fn last_message(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Empty the turn list, keeping the record alive.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.last_updated = Utc::now();
        tracing::debug!("conversation {} history cleared", self.id);
    }

    /// Summary statistics for this record.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            conversation_id: self.id.clone(),
            message_count: self.turns.len(),
            created_at: self.created_at,
            last_updated: self.last_updated,
            duration_secs: (self.last_updated - self.created_at).num_seconds(),
            user_messages: self
                .turns
                .iter()
                .filter(|t| t.role == MessageRole::User)
                .count(),
            assistant_messages: self
                .turns
                .iter()
                .filter(|t| t.role == MessageRole::Assistant)
                .count(),
        }
    }

    /// Backdate `last_updated` by `secs` seconds, for expiry tests.
    #[cfg(test)]
    pub(crate) fn backdate(&mut self, secs: i64) {
        self.last_updated -= chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_messages() {
        let mut record = ConversationRecord::new("c1:u1");
        record.add_message("user", "hi");
        record.add_message("assistant", "hello");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get_messages(None).len(), 2);
        assert_eq!(record.get_messages(Some(1)).len(), 1);
        assert_eq!(record.get_messages(Some(1))[0].content, "hello");
        assert_eq!(record.get_messages(Some(10)).len(), 2);
    }

    #[test]
    fn test_invalid_role_coerced_to_user() {
        let mut record = ConversationRecord::new("c1:u1");
        record.add_message("robot", "beep");

        assert_eq!(record.turns()[0].role, MessageRole::User);
    }

    #[test]
    fn test_last_message_and_clear() {
        let mut record = ConversationRecord::new("c1:u1");
        assert!(record.last_message().is_none());

        record.add_message("user", "first");
        record.add_message("user", "second");
        assert_eq!(record.last_message().unwrap().content, "second");

        record.clear();
        assert!(record.is_empty());
        assert!(record.last_message().is_none());
    }

    #[test]
    fn test_summary_counts_roles() {
        let mut record = ConversationRecord::new("c1:u1");
        record.add_message("user", "hi");
        record.add_message("assistant", "hello");
        record.add_message("user", "how are you?");

        let summary = record.summary();
        assert_eq!(summary.conversation_id, "c1:u1");
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.user_messages, 2);
        assert_eq!(summary.assistant_messages, 1);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut record = ConversationRecord::new("c1:u1");
        record.add_message("user", "hi");
        record.add_message("assistant", "hello");

        let json = serde_json::to_string(&record).unwrap();
        let restored: ConversationRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id(), record.id());
        assert_eq!(restored.len(), record.len());
        assert_eq!(restored.created_at(), record.created_at());
        assert_eq!(restored.last_updated(), record.last_updated());
        for (a, b) in restored.turns().iter().zip(record.turns()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
            assert_eq!(a.timestamp, b.timestamp);
        }
    }
}
