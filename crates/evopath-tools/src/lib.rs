//! Evopath Tools - Tool Registry and Execution Boundary
//!
//! This crate provides the tool side of the search engine:
//! - Executor: the `ToolExecutor` capability the engine dispatches tool calls to
//! - Registry: Tool registration and discovery
//! - Runner: Tool execution with timeouts, implements `ToolExecutor`
//! - Builtins: `file_read` and `http_get`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod executor;
pub mod registry;
pub mod runner;

pub use builtins::{register_builtins, BuiltinsConfig};
pub use error::{Error, Result};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolCategory, ToolDefinition, ToolRegistry, ToolResult};
pub use runner::{ExecutionResult, RunnerConfig, ToolRunner};
