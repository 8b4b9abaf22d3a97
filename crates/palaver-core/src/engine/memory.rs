//! Memory engine: strategy-driven conversation memory with durable
//! persistence.

use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ContextConfig;
use crate::error::PalaverResult;
use crate::store::DurableStore;
use crate::traits::LanguageModel;
use crate::types::{MessageRole, Turn};

use super::strategy::{ContextStrategy, StrategyParams, StrategyRegistry};

/// Rendered memory variables for prompt injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryVariables {
    pub history: String,
}

/// Construction parameters for a [`MemoryEngine`].
#[derive(Clone)]
pub struct EngineConfig {
    /// Name of the strategy to build from the registry.
    pub memory_type: String,
    /// Advisory token budget.
    pub max_token_limit: usize,
    /// Backing file for the durable store.
    pub store_path: PathBuf,
    /// Model for summarizing strategies.
    pub model: Option<Arc<dyn LanguageModel>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_context(&ContextConfig::default())
    }
}

impl EngineConfig {
    /// Derive engine parameters from shared configuration.
    pub fn from_context(config: &ContextConfig) -> Self {
        Self {
            memory_type: config.memory_type.clone(),
            max_token_limit: config.max_token_limit,
            store_path: config.store_path.clone(),
            model: None,
        }
    }

    /// Attach a language model.
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }
}

/// Per-caller memory engine applying a pluggable strategy to an in-memory
/// turn buffer, with each addition persisted to a [`DurableStore`].
///
/// Data-plane failures (storage writes, model calls during compaction)
/// are logged and surface as a `false` return; the in-memory buffer keeps
/// functioning regardless, so a failed persist costs only that turn's
/// durability. Registry and construction errors propagate.
pub struct MemoryEngine {
    strategy_name: String,
    max_token_limit: usize,
    turns: Vec<Turn>,
    strategy: Box<dyn ContextStrategy>,
    store: DurableStore,
    persist_seq: u64,
}

impl MemoryEngine {
    /// Build an engine from a registry and configuration.
    ///
    /// Fails fast on an unregistered strategy name or an unopenable store
    /// path.
    pub fn new(registry: &StrategyRegistry, config: EngineConfig) -> PalaverResult<Self> {
        let params = StrategyParams {
            max_token_limit: config.max_token_limit,
            model: config.model.clone(),
        };
        let strategy = registry.build(&config.memory_type, &params)?;
        let store = DurableStore::open(&config.store_path)?;

        Ok(Self {
            strategy_name: config.memory_type,
            max_token_limit: config.max_token_limit,
            turns: Vec::new(),
            strategy,
            store,
            persist_seq: 0,
        })
    }

    /// Name of the active strategy.
    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    /// Advisory token budget.
    pub fn max_token_limit(&self) -> usize {
        self.max_token_limit
    }

    /// The engine's durable store.
    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    /// Append a user turn. Returns `false` if persistence or compaction
    /// degraded; the turn is in memory either way.
    pub fn add_user_message(&mut self, text: &str) -> bool {
        self.add_message(MessageRole::User, text)
    }

    /// Append an assistant turn. Same degradation contract as
    /// [`MemoryEngine::add_user_message`].
    pub fn add_ai_message(&mut self, text: &str) -> bool {
        self.add_message(MessageRole::Assistant, text)
    }

    fn add_message(&mut self, role: MessageRole, text: &str) -> bool {
        let turn = Turn::new(role, text);
        let persisted = self.persist_turn(&turn);
        self.turns.push(turn);

        let compacted = match self.strategy.compact(&mut self.turns) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("context compaction failed: {}", e);
                false
            }
        };

        persisted && compacted
    }

    fn persist_turn(&mut self, turn: &Turn) -> bool {
        let kind = match turn.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "ai",
            MessageRole::System => "system",
        };
        self.persist_seq += 1;
        let key = format!(
            "{}_message_{}_{}",
            kind,
            turn.timestamp.timestamp_millis(),
            self.persist_seq
        );
        let saved = self.store.save(
            key,
            json!({
                "type": kind,
                "content": turn.content,
                "timestamp": turn.timestamp,
            }),
        );
        if !saved {
            tracing::error!("failed to persist {} message; continuing in memory", kind);
        }
        saved
    }

    /// The turn sequence the model should see now, per the active
    /// strategy.
    pub fn get_memory_context(&self) -> Vec<Turn> {
        self.strategy.context(&self.turns)
    }

    /// Empty the in-memory turns, strategy state, and the durable store.
    pub fn clear_memory(&mut self) -> bool {
        self.turns.clear();
        self.strategy.reset();
        self.store.clear()
    }

    /// Render the memory as variables for prompt injection.
    pub fn load_memory_variables(&self) -> MemoryVariables {
        MemoryVariables {
            history: self.strategy.render(&self.turns),
        }
    }

    /// Serialize the full turn list to a JSON file. Returns `false` on
    /// failure.
    pub fn export_memory(&self, path: impl AsRef<Path>) -> bool {
        let result: PalaverResult<()> = (|| {
            let json = serde_json::to_string_pretty(&self.turns)?;
            std::fs::write(path.as_ref(), json)?;
            Ok(())
        })();

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("memory export failed: {}", e);
                false
            }
        }
    }

    /// Replace the in-memory turns with a serialized list, replaying each
    /// turn through strategy compaction.
    ///
    /// Import deliberately bypasses the durable store: re-persisting
    /// replayed turns would duplicate entries when the store was not
    /// cleared first. Returns `false` on failure.
    pub fn import_memory(&mut self, path: impl AsRef<Path>) -> bool {
        let result: PalaverResult<Vec<Turn>> = (|| {
            let content = std::fs::read_to_string(path.as_ref())?;
            Ok(serde_json::from_str(&content)?)
        })();

        let imported = match result {
            Ok(imported) => imported,
            Err(e) => {
                tracing::error!("memory import failed: {}", e);
                return false;
            }
        };

        self.turns.clear();
        self.strategy.reset();

        let mut ok = true;
        for turn in imported {
            self.turns.push(turn);
            if let Err(e) = self.strategy.compact(&mut self.turns) {
                tracing::error!("context compaction failed during import: {}", e);
                ok = false;
            }
        }
        ok
    }
}
