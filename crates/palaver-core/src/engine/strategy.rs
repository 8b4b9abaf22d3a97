//! Context strategies and the strategy registry.
//!
//! A strategy decides what the model should see: the verbatim tail, a
//! rolling summary, a hybrid of both, or extracted entity notes. The
//! registry maps strategy names to constructors and is an owned value, not
//! process-global state, so tests and embedders get isolated registries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{PalaverError, PalaverResult};
use crate::traits::LanguageModel;
use crate::types::{format_turns, ApiMessage, MessageRole, Turn};

/// Built-in strategy names.
pub const BUFFER: &str = "buffer";
pub const SUMMARY: &str = "summary";
pub const SUMMARY_BUFFER: &str = "summary_buffer";
pub const ENTITY: &str = "entity";

/// Rough token estimate: whitespace-delimited words.
///
/// Deliberately approximate; the budget it gates is advisory and exact
/// token counting is out of scope.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

fn estimate_turns(turns: &[Turn]) -> usize {
    turns.iter().map(|t| estimate_tokens(&t.content)).sum()
}

/// Parameters handed to a strategy constructor.
#[derive(Clone)]
pub struct StrategyParams {
    /// Advisory token budget for the strategy's context.
    pub max_token_limit: usize,
    /// Model for summarization/extraction; strategies that need one
    /// degrade to plain trimming when it is absent.
    pub model: Option<Arc<dyn LanguageModel>>,
}

impl StrategyParams {
    /// Create parameters with a token budget and no model.
    pub fn new(max_token_limit: usize) -> Self {
        Self {
            max_token_limit,
            model: None,
        }
    }

    /// Attach a language model.
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }
}

/// A configured memory strategy driving one engine's buffer.
pub trait ContextStrategy: Send {
    /// Strategy name.
    fn name(&self) -> &str;

    /// Compact the turn buffer in place after an append. Turns removed
    /// from the head may be folded into strategy state (summary, entity
    /// notes) rather than discarded.
    fn compact(&mut self, turns: &mut Vec<Turn>) -> PalaverResult<()>;

    /// The turn sequence the model should see now. Best-effort within the
    /// token budget.
    fn context(&self, turns: &[Turn]) -> Vec<Turn>;

    /// Render the memory as a single history block for prompt injection.
    fn render(&self, turns: &[Turn]) -> String {
        format_turns(&self.context(turns))
    }

    /// Drop accumulated strategy state (summaries, entity notes).
    fn reset(&mut self);
}

/// Construction recipe turning parameters into a configured strategy.
pub trait StrategyConfig: Send + Sync + std::fmt::Debug {
    fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>>;
}

/// Maps strategy names to construction recipes.
///
/// Last registration for a name wins. Unknown names fail loudly with
/// [`PalaverError::NotFound`]; a missing strategy is a configuration
/// error, not a runtime condition to swallow.
pub struct StrategyRegistry {
    strategies: HashMap<String, Box<dyn StrategyConfig>>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Create a registry with the built-in strategies registered:
    /// `buffer`, `summary`, `summary_buffer`, and `entity`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_strategy(BUFFER, Box::new(BufferConfig));
        registry.register_strategy(SUMMARY, Box::new(SummaryConfig));
        registry.register_strategy(SUMMARY_BUFFER, Box::new(SummaryBufferConfig));
        registry.register_strategy(ENTITY, Box::new(EntityConfig));
        registry
    }

    /// Register a strategy under `name`, replacing any previous
    /// registration.
    pub fn register_strategy(&mut self, name: impl Into<String>, config: Box<dyn StrategyConfig>) {
        let name = name.into();
        if self.strategies.insert(name.clone(), config).is_some() {
            tracing::debug!("strategy '{}' re-registered", name);
        }
    }

    /// Look up a registered strategy constructor.
    pub fn get_strategy(&self, name: &str) -> PalaverResult<&dyn StrategyConfig> {
        self.strategies
            .get(name)
            .map(|config| config.as_ref())
            .ok_or_else(|| PalaverError::strategy_not_found(name))
    }

    /// Build a configured strategy by name.
    pub fn build(
        &self,
        name: &str,
        params: &StrategyParams,
    ) -> PalaverResult<Box<dyn ContextStrategy>> {
        self.get_strategy(name)?.build(params)
    }

    /// Registered strategy names, sorted.
    pub fn strategy_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

const SUMMARY_PROMPT: &str = "\
Progressively summarize the conversation below. Merge the new lines into \
the current summary, keeping facts, decisions, and open questions, and \
return only the updated summary.";

const ENTITY_PROMPT: &str = "\
Extract the salient entities (people, places, projects, preferences) from \
the message below. Return one entity per line as `name: fact`. Return \
nothing if there are none.";

/// Fold `turns` into `current` via the model's progressive summary.
fn summarize(
    model: &dyn LanguageModel,
    current: &str,
    turns: &[Turn],
) -> PalaverResult<String> {
    let prompt = format!(
        "{}\n\nCurrent summary:\n{}\n\nNew lines of conversation:\n{}\n\nNew summary:",
        SUMMARY_PROMPT,
        current,
        format_turns(turns)
    );
    let response = model.complete(&[ApiMessage::new(MessageRole::System, prompt)])?;
    Ok(response.trim().to_string())
}

/// Ask the model for `name: fact` entity lines in a turn.
fn extract_entities(model: &dyn LanguageModel, turn: &Turn) -> PalaverResult<Vec<(String, String)>> {
    let prompt = format!("{}\n\nMessage:\n{}", ENTITY_PROMPT, turn.content);
    let response = model.complete(&[ApiMessage::new(MessageRole::System, prompt)])?;

    Ok(response
        .lines()
        .filter_map(|line| {
            let (name, fact) = line.split_once(':')?;
            let (name, fact) = (name.trim(), fact.trim());
            if name.is_empty() || fact.is_empty() {
                None
            } else {
                Some((name.to_string(), fact.to_string()))
            }
        })
        .collect())
}

/// Drop head turns until the buffer fits the budget, always keeping the
/// most recent turn.
fn trim_to_budget(turns: &mut Vec<Turn>, max_tokens: usize) {
    while turns.len() > 1 && estimate_turns(turns) > max_tokens {
        turns.remove(0);
    }
}

/// How many head turns must go for the rest to fit the budget. Never cuts
/// the most recent turn.
fn overflow_cut(turns: &[Turn], max_tokens: usize) -> usize {
    let mut total = estimate_turns(turns);
    let mut cut = 0;
    while total > max_tokens && cut + 1 < turns.len() {
        total -= estimate_tokens(&turns[cut].content);
        cut += 1;
    }
    cut
}

// ---------------------------------------------------------------------------
// buffer

/// `buffer`: verbatim recent turns up to the token budget.
#[derive(Debug)]
pub struct BufferConfig;

impl StrategyConfig for BufferConfig {
    fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>> {
        Ok(Box::new(BufferStrategy {
            max_tokens: params.max_token_limit,
        }))
    }
}

struct BufferStrategy {
    max_tokens: usize,
}

impl ContextStrategy for BufferStrategy {
    fn name(&self) -> &str {
        BUFFER
    }

    fn compact(&mut self, turns: &mut Vec<Turn>) -> PalaverResult<()> {
        trim_to_budget(turns, self.max_tokens);
        Ok(())
    }

    fn context(&self, turns: &[Turn]) -> Vec<Turn> {
        turns.to_vec()
    }

    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
// summary

/// `summary`: a model-maintained rolling summary replaces the raw turns.
#[derive(Debug)]
pub struct SummaryConfig;

impl StrategyConfig for SummaryConfig {
    fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>> {
        Ok(Box::new(SummaryStrategy {
            max_tokens: params.max_token_limit,
            model: params.model.clone(),
            summary: String::new(),
        }))
    }
}

struct SummaryStrategy {
    max_tokens: usize,
    model: Option<Arc<dyn LanguageModel>>,
    summary: String,
}

impl ContextStrategy for SummaryStrategy {
    fn name(&self) -> &str {
        SUMMARY
    }

    fn compact(&mut self, turns: &mut Vec<Turn>) -> PalaverResult<()> {
        if turns.is_empty() {
            return Ok(());
        }
        match &self.model {
            Some(model) => {
                // Summarize before draining so a model failure loses nothing.
                self.summary = summarize(model.as_ref(), &self.summary, turns)?;
                turns.clear();
            }
            None => {
                tracing::warn!("summary strategy has no model; falling back to buffer trimming");
                trim_to_budget(turns, self.max_tokens);
            }
        }
        Ok(())
    }

    fn context(&self, turns: &[Turn]) -> Vec<Turn> {
        let mut context = Vec::new();
        if !self.summary.is_empty() {
            context.push(Turn::system(self.summary.clone()));
        }
        context.extend_from_slice(turns);
        context
    }

    fn reset(&mut self) {
        self.summary.clear();
    }
}

// ---------------------------------------------------------------------------
// summary_buffer

/// `summary_buffer`: keep a verbatim tail; once the budget is exceeded,
/// fold the head into a rolling summary.
#[derive(Debug)]
pub struct SummaryBufferConfig;

impl StrategyConfig for SummaryBufferConfig {
    fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>> {
        Ok(Box::new(SummaryBufferStrategy {
            max_tokens: params.max_token_limit,
            model: params.model.clone(),
            summary: String::new(),
        }))
    }
}

struct SummaryBufferStrategy {
    max_tokens: usize,
    model: Option<Arc<dyn LanguageModel>>,
    summary: String,
}

impl ContextStrategy for SummaryBufferStrategy {
    fn name(&self) -> &str {
        SUMMARY_BUFFER
    }

    fn compact(&mut self, turns: &mut Vec<Turn>) -> PalaverResult<()> {
        let cut = overflow_cut(turns, self.max_tokens);
        if cut == 0 {
            return Ok(());
        }

        match &self.model {
            Some(model) => {
                self.summary = summarize(model.as_ref(), &self.summary, &turns[..cut])?;
            }
            None => {
                tracing::warn!(
                    "summary_buffer strategy has no model; dropping {} oldest turns",
                    cut
                );
            }
        }
        turns.drain(..cut);
        Ok(())
    }

    fn context(&self, turns: &[Turn]) -> Vec<Turn> {
        let mut context = Vec::new();
        if !self.summary.is_empty() {
            context.push(Turn::system(self.summary.clone()));
        }
        context.extend_from_slice(turns);
        context
    }

    fn reset(&mut self) {
        self.summary.clear();
    }
}

// ---------------------------------------------------------------------------
// entity

/// `entity`: retain salient entity notes instead of raw text, plus a
/// budget-bounded verbatim tail.
#[derive(Debug)]
pub struct EntityConfig;

impl StrategyConfig for EntityConfig {
    fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>> {
        Ok(Box::new(EntityStrategy {
            max_tokens: params.max_token_limit,
            model: params.model.clone(),
            entities: BTreeMap::new(),
        }))
    }
}

struct EntityStrategy {
    max_tokens: usize,
    model: Option<Arc<dyn LanguageModel>>,
    // BTreeMap keeps the rendered notes deterministic.
    entities: BTreeMap<String, String>,
}

impl ContextStrategy for EntityStrategy {
    fn name(&self) -> &str {
        ENTITY
    }

    fn compact(&mut self, turns: &mut Vec<Turn>) -> PalaverResult<()> {
        if let Some(model) = &self.model {
            if let Some(latest) = turns.last() {
                for (name, fact) in extract_entities(model.as_ref(), latest)? {
                    self.entities.insert(name, fact);
                }
            }
        } else {
            tracing::warn!("entity strategy has no model; no entities will be extracted");
        }
        trim_to_budget(turns, self.max_tokens);
        Ok(())
    }

    fn context(&self, turns: &[Turn]) -> Vec<Turn> {
        let mut context = Vec::new();
        if !self.entities.is_empty() {
            let notes = self
                .entities
                .iter()
                .map(|(name, fact)| format!("{}: {}", name, fact))
                .collect::<Vec<_>>()
                .join("\n");
            context.push(Turn::system(format!("Entity notes:\n{}", notes)));
        }
        context.extend_from_slice(turns);
        context
    }

    fn reset(&mut self) {
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockLanguageModel;

    fn params(max_tokens: usize) -> StrategyParams {
        StrategyParams::new(max_tokens)
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("one two three"), 3);
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   spaced    out   "), 2);
    }

    #[test]
    fn test_registry_unknown_name_fails() {
        let registry = StrategyRegistry::with_builtins();
        let err = registry.get_strategy("unregistered_name").unwrap_err();
        assert!(matches!(err, PalaverError::NotFound { .. }));
    }

    #[test]
    fn test_registry_builtins_present() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(
            registry.strategy_names(),
            vec!["buffer", "entity", "summary", "summary_buffer"]
        );
        for name in [BUFFER, SUMMARY, SUMMARY_BUFFER, ENTITY] {
            assert!(registry.get_strategy(name).is_ok());
        }
    }

    #[test]
    fn test_registry_register_and_last_wins() {
        #[derive(Debug)]
        struct FixedName(&'static str);
        impl StrategyConfig for FixedName {
            fn build(&self, params: &StrategyParams) -> PalaverResult<Box<dyn ContextStrategy>> {
                let _ = self.0;
                BufferConfig.build(params)
            }
        }

        let mut registry = StrategyRegistry::new();
        registry.register_strategy("custom", Box::new(FixedName("first")));
        assert!(registry.get_strategy("custom").is_ok());

        // re-registration replaces silently
        registry.register_strategy("custom", Box::new(FixedName("second")));
        assert_eq!(registry.strategy_names(), vec!["custom"]);
        assert!(registry.build("custom", &params(10)).is_ok());
    }

    #[test]
    fn test_buffer_trims_head_keeps_tail_order() {
        let mut strategy = BufferConfig.build(&params(4)).unwrap();
        let mut turns = vec![
            Turn::user("one two"),
            Turn::assistant("three four"),
            Turn::user("five six"),
        ];
        strategy.compact(&mut turns).unwrap();

        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["three four", "five six"]);
        assert_eq!(strategy.context(&turns).len(), 2);
    }

    #[test]
    fn test_buffer_keeps_oversized_last_turn() {
        let mut strategy = BufferConfig.build(&params(1)).unwrap();
        let mut turns = vec![Turn::user("far too many words to ever fit")];
        strategy.compact(&mut turns).unwrap();
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_summary_folds_everything_into_summary() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("running summary".to_string()));

        let strategy_params = params(100).with_model(Arc::new(model));
        let mut strategy = SummaryConfig.build(&strategy_params).unwrap();

        let mut turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        strategy.compact(&mut turns).unwrap();

        assert!(turns.is_empty());
        let context = strategy.context(&turns);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].role, MessageRole::System);
        assert_eq!(context[0].content, "running summary");
    }

    #[test]
    fn test_summary_without_model_degrades_to_trimming() {
        let mut strategy = SummaryConfig.build(&params(2)).unwrap();
        let mut turns = vec![
            Turn::user("one two"),
            Turn::user("three four"),
            Turn::user("five six"),
        ];
        strategy.compact(&mut turns).unwrap();

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "five six");
    }

    #[test]
    fn test_summary_buffer_folds_head_keeps_tail() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("head summary".to_string()));

        let strategy_params = params(4).with_model(Arc::new(model));
        let mut strategy = SummaryBufferConfig.build(&strategy_params).unwrap();

        let mut turns = vec![
            Turn::user("one two"),
            Turn::assistant("three four"),
            Turn::user("five six"),
        ];
        strategy.compact(&mut turns).unwrap();

        // head folded into summary, tail verbatim
        assert_eq!(turns.len(), 2);
        let context = strategy.context(&turns);
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].role, MessageRole::System);
        assert_eq!(context[0].content, "head summary");
        assert_eq!(context[1].content, "three four");
        assert_eq!(context[2].content, "five six");
    }

    #[test]
    fn test_summary_buffer_under_budget_is_untouched() {
        let mut strategy = SummaryBufferConfig.build(&params(100)).unwrap();
        let mut turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        strategy.compact(&mut turns).unwrap();

        assert_eq!(turns.len(), 2);
        // no summary accumulated, context is the raw turns
        assert_eq!(strategy.context(&turns).len(), 2);
    }

    #[test]
    fn test_summary_failure_loses_no_turns() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Err(PalaverError::model("backend down")));

        let strategy_params = params(100).with_model(Arc::new(model));
        let mut strategy = SummaryConfig.build(&strategy_params).unwrap();

        let mut turns = vec![Turn::user("hi")];
        assert!(strategy.compact(&mut turns).is_err());
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_entity_extraction_and_reset() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("Alice: works on the parser\nBob: prefers dark mode".to_string()));

        let strategy_params = params(100).with_model(Arc::new(model));
        let mut strategy = EntityConfig.build(&strategy_params).unwrap();

        let mut turns = vec![Turn::user("Alice and Bob were talking")];
        strategy.compact(&mut turns).unwrap();

        let context = strategy.context(&turns);
        assert_eq!(context.len(), 2);
        assert!(context[0].content.contains("Alice: works on the parser"));
        assert!(context[0].content.contains("Bob: prefers dark mode"));

        strategy.reset();
        assert_eq!(strategy.context(&turns).len(), 1);
    }

    #[test]
    fn test_entity_parse_skips_malformed_lines() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("no separator here\nCarol: ships on friday\n: empty name".to_string()));

        let entities =
            extract_entities(&model as &dyn LanguageModel, &Turn::user("whatever")).unwrap();
        assert_eq!(entities, vec![("Carol".to_string(), "ships on friday".to_string())]);
    }

    #[test]
    fn test_render_uses_context() {
        let strategy = BufferConfig.build(&params(100)).unwrap();
        let turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        assert_eq!(strategy.render(&turns), "[user]: hi\n[assistant]: hello");
    }
}
