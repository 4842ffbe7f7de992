//! Executor - the capability the search engine calls tools through

use crate::error::Result;

/// Something that can run a named tool with JSON arguments.
///
/// A returned `Err` is a tool failure, not a transport failure of the caller:
/// the engine records it and feeds the message back to the model.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Invoke `name` with `arguments` and return its output.
    async fn invoke(&self, name: &str, arguments: serde_json::Value) -> Result<serde_json::Value>;
}
