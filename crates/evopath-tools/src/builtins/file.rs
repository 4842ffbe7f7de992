//! File tool - read text files with path and sensitivity checks

use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Sensitive file-name fragments
static SENSITIVE_FILE_PATTERNS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        ".env",
        "credentials",
        "secret",
        ".aws",
        ".ssh",
        "id_rsa",
        "id_ed25519",
        ".npmrc",
        ".pypirc",
        "token",
        "api_key",
        "apikey",
        "password",
        ".htpasswd",
        "shadow",
        "passwd",
    ]
});

/// Blocked directory prefixes
static BLOCKED_DIRECTORIES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "/etc", "/root", "/var/log", "/boot", "/dev", "/proc", "/sys", "/usr/bin", "/usr/sbin",
        "/bin", "/sbin", "/var/run", "/run",
    ]
});

fn check_blocked(path: &str, original: &str) -> Result<()> {
    for blocked in BLOCKED_DIRECTORIES.iter() {
        let hit = path == *blocked
            || path
                .strip_prefix(blocked)
                .is_some_and(|rest| rest.starts_with('/'));
        if hit {
            warn!(path = %original, resolved = %path, blocked = %blocked, "Access to blocked directory");
            return Err(Error::PermissionDenied(format!(
                "Access to '{}' is restricted",
                blocked
            )));
        }
    }
    Ok(())
}

/// Validate a path and resolve symlinks where the file exists
pub fn validate_path(path: &str) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return Err(Error::InvalidInput("Path must not be empty".to_string()));
    }

    let path_buf = PathBuf::from(path);
    if path_buf
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        warn!(path = %path, "Path traversal attempt detected");
        return Err(Error::PermissionDenied(
            "Path traversal (..) is not allowed".to_string(),
        ));
    }

    check_blocked(&path_buf.to_string_lossy(), path)?;

    let canonical = if path_buf.exists() {
        path_buf.canonicalize().map_err(|e| {
            Error::PermissionDenied(format!("Cannot resolve path '{}': {}", path, e))
        })?
    } else {
        path_buf
    };

    // symlinks may point into a blocked area
    check_blocked(&canonical.to_string_lossy(), path)?;

    debug!(original = %path, canonical = %canonical.display(), "Path validated");
    Ok(canonical)
}

/// Check if a file is sensitive based on its name
pub fn is_sensitive_file(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    SENSITIVE_FILE_PATTERNS
        .iter()
        .any(|pattern| file_name.contains(pattern))
}

/// Tool for reading file contents
pub struct FileReadTool {
    definition: ToolDefinition,
    max_bytes: usize,
}

impl FileReadTool {
    /// Create a new file read tool with a byte cap
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        let definition = ToolDefinition::new("file_read", "Read the contents of a text file")
            .with_category(ToolCategory::File)
            .with_parameters(serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the file to read"
                    },
                    "max_bytes": {
                        "type": "integer",
                        "description": "Maximum bytes to read"
                    }
                },
                "required": ["path"]
            }));

        Self {
            definition,
            max_bytes,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FileReadTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let path = input
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'path' parameter".to_string()))?;

        let file_path = validate_path(path)?;

        if is_sensitive_file(&file_path) {
            warn!(path = %path, "Attempt to read potentially sensitive file");
            return Err(Error::PermissionDenied(format!(
                "Reading '{}' is restricted - file appears to contain sensitive data",
                file_path.file_name().unwrap_or_default().to_string_lossy()
            )));
        }

        let max_bytes = input
            .get("max_bytes")
            .and_then(|v| v.as_u64())
            .map_or(self.max_bytes, |n| (n as usize).min(self.max_bytes));

        debug!(path = %path, max_bytes = %max_bytes, "Reading file");

        let file = tokio::fs::File::open(&file_path).await?;
        let mut contents = Vec::new();
        file.take(max_bytes as u64 + 1)
            .read_to_end(&mut contents)
            .await?;

        let truncated = contents.len() > max_bytes;
        contents.truncate(max_bytes);
        let content = String::from_utf8_lossy(&contents).into_owned();

        Ok(ToolResult::success(
            serde_json::json!({
                "content": content,
                "path": path,
                "size": contents.len(),
                "truncated": truncated
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_path_rejects_traversal_and_blocked() {
        assert!(validate_path("../secrets.txt").is_err());
        assert!(validate_path("/tmp/../etc/passwd").is_err());
        assert!(validate_path("/etc/hosts").is_err());
        assert!(validate_path("/proc/self/environ").is_err());
        assert!(validate_path("").is_err());
    }

    #[test]
    fn test_blocked_prefix_is_per_component() {
        // "/binary" is not under "/bin"
        assert!(check_blocked("/binary/data.txt", "/binary/data.txt").is_ok());
        assert!(check_blocked("/bin/sh", "/bin/sh").is_err());
    }

    #[test]
    fn test_is_sensitive_file() {
        assert!(is_sensitive_file(Path::new("/app/.env")));
        assert!(is_sensitive_file(Path::new("/home/u/.ssh/id_rsa")));
        assert!(is_sensitive_file(Path::new("service_token.json")));
        assert!(!is_sensitive_file(Path::new("/app/README.md")));
    }

    #[tokio::test]
    async fn test_read_with_cap() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "hello world").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let tool = FileReadTool::new(1024);
        let full = tool
            .execute(serde_json::json!({"path": path}))
            .await
            .unwrap();
        assert_eq!(full.output["content"], "hello world");
        assert_eq!(full.output["truncated"], false);

        let capped = tool
            .execute(serde_json::json!({"path": path, "max_bytes": 5}))
            .await
            .unwrap();
        assert_eq!(capped.output["content"], "hello");
        assert_eq!(capped.output["truncated"], true);
    }

    #[tokio::test]
    async fn test_missing_path_parameter() {
        let tool = FileReadTool::new(1024);
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
