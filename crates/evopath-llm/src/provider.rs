//! LLM Provider trait definition
//!
//! This module defines the core trait that all generation services implement.

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::Result;

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation, optionally offering tools.
    ///
    /// An empty `tools` list is a plain text completion.
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}
