//! Registry - Tool registration and discovery
//!
//! Tools register with metadata and a JSON-schema parameter description. The
//! registry hands enabled definitions to the model in LLM tool format.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Tool category for organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// File operations
    File,
    /// HTTP/network operations
    Http,
    /// Utility operations
    Utility,
}

impl ToolCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Http => "http",
            Self::Utility => "utility",
        }
    }
}

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
    /// Tool category
    pub category: ToolCategory,
    /// Whether the tool is enabled
    pub enabled: bool,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            category: ToolCategory::Utility,
            enabled: true,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    /// Set enabled status
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Convert to the LLM tool format
    #[must_use]
    pub fn to_llm(&self) -> evopath_llm::ToolDefinition {
        evopath_llm::ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output data
    pub output: serde_json::Value,
    /// Error message if failed
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if !input.is_object() {
            return Err(Error::InvalidInput("Input must be an object".to_string()));
        }
        Ok(())
    }
}

/// Registry for managing tools
///
/// Ordered by name so the tool list offered to the model is stable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    disabled: std::collections::BTreeSet<String>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let def = tool.definition();
        let name = def.name.clone();
        debug!(tool = %name, category = def.category.as_str(), "Registering tool");
        if def.enabled {
            self.disabled.remove(&name);
        } else {
            self.disabled.insert(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check if a registered tool is enabled
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.has(name) && !self.disabled.contains(name)
    }

    /// List all tool names
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Disable a tool; `false` if it is not registered
    pub fn disable(&mut self, name: &str) -> bool {
        if !self.has(name) {
            return false;
        }
        self.disabled.insert(name.to_string());
        true
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Enabled definitions in LLM tool format
    #[must_use]
    pub fn to_llm_tools(&self) -> Vec<evopath_llm::ToolDefinition> {
        self.tools
            .iter()
            .filter(|(name, _)| !self.disabled.contains(name.as_str()))
            .map(|(_, tool)| tool.definition().to_llm())
            .collect()
    }
}
