//! Application configuration types

use evopath_core::SearchConfig;
use evopath_llm::OllamaConfig;
use evopath_tools::{register_builtins, BuiltinsConfig, RunnerConfig, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let ollama = OllamaConfig::default();
        Self {
            base_url: ollama.base_url,
            model: ollama.default_model,
            max_tokens: ollama.default_max_tokens,
            timeout_secs: ollama.timeout.as_secs(),
        }
    }
}

impl LlmConfig {
    pub fn to_ollama(&self) -> OllamaConfig {
        OllamaConfig::new()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_max_tokens(self.max_tokens)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Built-in tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub timeout_secs: u64,
    pub max_timeout_secs: u64,
    pub enable_http: bool,
    pub max_bytes: usize,
    /// Registered but not offered to the model and refused by the runner
    pub disabled: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let builtins = BuiltinsConfig::default();
        let runner = RunnerConfig::default();
        Self {
            timeout_secs: runner.default_timeout.as_secs(),
            max_timeout_secs: runner.max_timeout.as_secs(),
            enable_http: builtins.enable_http,
            max_bytes: builtins.max_bytes,
            disabled: Vec::new(),
        }
    }
}

impl ToolsConfig {
    pub fn builtins(&self) -> BuiltinsConfig {
        BuiltinsConfig {
            enable_http: self.enable_http,
            max_bytes: self.max_bytes,
            http_timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig::new(Duration::from_secs(self.timeout_secs))
            .with_max_timeout(Duration::from_secs(self.max_timeout_secs))
    }

    /// Registry with the built-ins, minus the disabled ones
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &self.builtins());
        for name in &self.disabled {
            if !registry.disable(name) {
                warn!(tool = %name, "Cannot disable unknown tool");
            }
        }
        registry
    }
}
