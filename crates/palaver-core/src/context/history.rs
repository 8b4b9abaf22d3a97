//! Multi-conversation history manager with a conversation-count cap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PalaverResult;

use super::record::{ConversationRecord, RecordSummary};

/// Caps the number of live conversations rather than turns per
/// conversation (the [`ContextManager`](super::ContextManager) caps the
/// latter).
///
/// When creating a record pushes the total over `max_conversations`, the
/// record with the smallest `(last_updated, creation order)` is evicted,
/// so eviction is deterministic even for identical timestamps.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationHistoryManager {
    max_conversations: usize,
    histories: HashMap<String, ConversationRecord>,
    #[serde(default)]
    next_seq: u64,
}

impl ConversationHistoryManager {
    /// Create a manager capped at `max_conversations` records.
    pub fn new(max_conversations: usize) -> Self {
        tracing::debug!(
            "history manager initialized with max_conversations={}",
            max_conversations
        );
        Self {
            max_conversations,
            histories: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Get the record for a conversation, creating it on first access.
    pub fn get_history(&mut self, conversation_id: &str) -> &mut ConversationRecord {
        if !self.histories.contains_key(conversation_id) {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.histories.insert(
                conversation_id.to_string(),
                ConversationRecord::new(conversation_id).with_seq(seq),
            );

            if self.histories.len() > self.max_conversations {
                self.evict_oldest();
            }
        }

        self.histories
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationRecord::new(conversation_id))
    }

    /// Append a turn to a conversation's record.
    pub fn add_message(&mut self, conversation_id: &str, role: &str, content: impl Into<String>) {
        self.get_history(conversation_id).add_message(role, content);
    }

    /// Empty a conversation's turn list, keeping the record.
    pub fn clear_history(&mut self, conversation_id: &str) {
        if let Some(record) = self.histories.get_mut(conversation_id) {
            record.clear();
        }
    }

    /// Delete a conversation's record entirely.
    pub fn delete_history(&mut self, conversation_id: &str) {
        if self.histories.remove(conversation_id).is_some() {
            tracing::debug!("conversation history {} deleted", conversation_id);
        }
    }

    /// All live conversation ids.
    pub fn conversation_ids(&self) -> Vec<String> {
        self.histories.keys().cloned().collect()
    }

    /// Summary statistics for every live conversation.
    pub fn summaries(&self) -> Vec<RecordSummary> {
        self.histories.values().map(|r| r.summary()).collect()
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Serialize the manager and every record to JSON for snapshotting.
    pub fn to_json(&self) -> PalaverResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a manager from a [`ConversationHistoryManager::to_json`]
    /// snapshot.
    pub fn from_json(json: &str) -> PalaverResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .histories
            .values()
            .min_by_key(|record| (record.last_updated(), record.seq()))
            .map(|record| record.id().to_string());

        if let Some(id) = oldest {
            self.histories.remove(&id);
            tracing::debug!("oldest conversation history ({}) evicted", id);
        }
    }
}
