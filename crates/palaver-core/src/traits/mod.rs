//! Traits for external collaborators.

mod llm;

pub use llm::LanguageModel;

#[cfg(test)]
pub use llm::MockLanguageModel;
