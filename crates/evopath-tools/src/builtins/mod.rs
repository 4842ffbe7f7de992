//! Builtins - Built-in tools
//!
//! - `file_read`: read a local text file
//! - `http_get`: fetch a public URL

mod file;
mod http;

pub use file::{is_sensitive_file, validate_path, FileReadTool};
pub use http::HttpGetTool;

use crate::registry::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for built-in tools
#[derive(Debug, Clone)]
pub struct BuiltinsConfig {
    /// Register `http_get`
    pub enable_http: bool,
    /// Byte cap for `file_read` and `http_get` bodies
    pub max_bytes: usize,
    /// HTTP client timeout
    pub http_timeout: Duration,
}

impl Default for BuiltinsConfig {
    fn default() -> Self {
        Self {
            enable_http: true,
            max_bytes: 1_048_576,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Register all built-in tools with the given configuration
pub fn register_builtins(registry: &mut ToolRegistry, config: &BuiltinsConfig) {
    registry.register(Arc::new(FileReadTool::new(config.max_bytes)));

    if config.enable_http {
        registry.register(Arc::new(HttpGetTool::new(config.http_timeout, config.max_bytes)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtins() {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &BuiltinsConfig::default());
        assert!(registry.has("file_read"));
        assert!(registry.has("http_get"));

        let mut offline = ToolRegistry::new();
        let config = BuiltinsConfig {
            enable_http: false,
            ..Default::default()
        };
        register_builtins(&mut offline, &config);
        assert_eq!(offline.list_names(), vec!["file_read"]);
    }
}
