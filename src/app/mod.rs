//! Application wiring: configuration and service construction

mod config;
mod loader;

pub use config::AppConfig;
pub use loader::{load_config, DEFAULT_CONFIG};

use anyhow::{Context, Result};
use evopath_llm::{LlmProvider, OllamaProvider};
use evopath_tools::ToolRunner;
use std::sync::Arc;
use tracing::info;

/// Services the search runs against
pub struct Services {
    pub llm: Arc<dyn LlmProvider>,
    pub runner: Arc<ToolRunner>,
}

/// Build the generation service and tool runner from configuration
pub fn build_services(config: &AppConfig) -> Result<Services> {
    let provider =
        OllamaProvider::new(config.llm.to_ollama()).context("Failed to create LLM provider")?;

    let registry = config.tools.registry();
    info!(
        tools = ?registry.list_names(),
        disabled = ?config.tools.disabled,
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        "Services initialized"
    );

    let runner = ToolRunner::new(Arc::new(registry), config.tools.runner());
    Ok(Services {
        llm: Arc::new(provider),
        runner: Arc::new(runner),
    })
}
