//! Conversation context management.

mod history;
mod manager;
mod record;

pub use history::ConversationHistoryManager;
pub use manager::ContextManager;
pub use record::{ConversationRecord, RecordSummary};
