//! Language-model seam for summarizing strategies.

use crate::error::PalaverResult;
use crate::types::ApiMessage;

/// Caller-supplied language model used by the `summary`, `summary_buffer`,
/// and `entity` strategies.
///
/// The core never talks to a model itself; summarization quality is the
/// collaborator's concern. Calls are synchronous: an implementation
/// backed by an async client should block on its own runtime.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the given role-tagged messages.
    fn complete(&self, messages: &[ApiMessage]) -> PalaverResult<String>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}
