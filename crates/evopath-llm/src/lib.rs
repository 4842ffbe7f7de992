//! Evopath LLM - Generation Service Abstraction
//!
//! This crate provides the generation-service boundary used by the search engine:
//! - Provider: the `LlmProvider` trait every backend implements
//! - Message / Tools / Completion: request and response types
//! - Mock: a scriptable provider for tests
//! - Ollama: local Ollama chat API provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod ollama;
pub mod provider;
pub mod tools;

pub use completion::{CompletionRequest, TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use ollama::{OllamaConfig, OllamaProvider};
pub use provider::LlmProvider;
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
