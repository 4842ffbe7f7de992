//! Runner - Tool execution engine
//!
//! Looks tools up in the registry, enforces the enabled flag and timeouts,
//! and implements [`ToolExecutor`] for the search engine.

use crate::error::{Error, Result};
use crate::executor::ToolExecutor;
use crate::registry::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// Configuration for the tool runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Default timeout for tool execution
    pub default_timeout: Duration,
    /// Maximum timeout allowed
    pub max_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with default timeout
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..Default::default()
        }
    }

    /// Set the maximum timeout
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    fn effective_timeout(&self) -> Duration {
        self.default_timeout.min(self.max_timeout)
    }
}

/// Tool execution result with additional metadata
#[derive(Debug)]
pub struct ExecutionResult {
    /// The tool result
    pub result: ToolResult,
    /// Tool name
    pub tool_name: String,
}

/// Tool runner for executing registered tools
#[derive(Clone)]
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Create a new tool runner
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, RunnerConfig::default())
    }

    /// Get the registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool by name
    ///
    /// A tool that returns `Err` is reported as a failed [`ToolResult`]; only
    /// lookup, permission, validation and timeout problems are `Err` here.
    #[instrument(skip(self, input), fields(tool = %tool_name))]
    pub async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<ExecutionResult> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| Error::NotFound(tool_name.to_string()))?;

        if !self.registry.is_enabled(tool_name) {
            return Err(Error::PermissionDenied(format!(
                "Tool '{}' is disabled",
                tool_name
            )));
        }

        tool.validate_input(&input)?;

        let execution_timeout = self.config.effective_timeout();
        let start = Instant::now();
        debug!(tool = %tool_name, timeout_ms = %execution_timeout.as_millis(), "Executing tool");

        let result = match timeout(execution_timeout, tool.execute(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let duration = start.elapsed().as_millis() as u64;
                error!(tool = %tool_name, error = %e, "Tool execution failed");
                ToolResult::failure(e.to_string(), duration)
            }
            Err(_) => {
                let duration = start.elapsed().as_millis() as u64;
                warn!(tool = %tool_name, timeout_ms = %execution_timeout.as_millis(), "Tool execution timed out");
                return Err(Error::Timeout(duration));
            }
        };

        debug!(
            tool = %tool_name,
            success = %result.success,
            duration_ms = %result.duration_ms,
            "Tool execution completed"
        );

        Ok(ExecutionResult {
            result,
            tool_name: tool_name.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ToolRunner {
    async fn invoke(&self, name: &str, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let execution = self.execute(name, arguments).await?;
        if execution.result.success {
            Ok(execution.result.output)
        } else {
            Err(Error::Execution(
                execution
                    .result
                    .error
                    .unwrap_or_else(|| format!("tool '{}' failed", execution.tool_name)),
            ))
        }
    }
}
