//! palaver-core - short-term conversational memory for chat agents.
//!
//! This crate provides per-conversation turn records with count- and
//! time-based eviction, pluggable memory strategies (raw buffer, rolling
//! summary, hybrid, entity notes), and a JSON-file durable store.
//!
//! # Example
//!
//! ```
//! use palaver_core::{ContextConfig, ContextManager};
//!
//! let config = ContextConfig::default();
//! let mut context = ContextManager::new(&config);
//!
//! context.add_message("user-1", "channel-1", "hi there", false);
//! context.add_message("user-1", "channel-1", "hello!", true);
//!
//! let (api_messages, debug) = context.get_formatted_history("user-1", "channel-1");
//! assert_eq!(api_messages.len(), 2);
//! assert_eq!(debug, "[user]: hi there\n[assistant]: hello!");
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::ContextConfig;
pub use context::{ContextManager, ConversationHistoryManager, ConversationRecord, RecordSummary};
pub use engine::{
    ContextStrategy, EngineConfig, MemoryEngine, MemoryVariables, StrategyConfig, StrategyParams,
    StrategyRegistry,
};
pub use error::{ErrorCode, PalaverError, PalaverResult};
pub use store::{DurableStore, StoreEntry};
pub use traits::LanguageModel;
pub use types::{format_turns, ApiMessage, MessageRole, Turn};
