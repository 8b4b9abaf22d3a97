//! Memory engine and strategy registry.

mod memory;
mod strategy;

pub use memory::{EngineConfig, MemoryEngine, MemoryVariables};
pub use strategy::{
    estimate_tokens, BufferConfig, ContextStrategy, EntityConfig, StrategyConfig, StrategyParams,
    StrategyRegistry, SummaryBufferConfig, SummaryConfig, BUFFER, ENTITY, SUMMARY, SUMMARY_BUFFER,
};
