//! HTTP tool - GET requests against public hosts

use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use std::collections::HashSet;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Blocked hosts for SSRF protection
static BLOCKED_HOSTS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "localhost",
        "127.0.0.1",
        "0.0.0.0",
        "::1",
        "[::1]",
        "metadata.google.internal",
        "169.254.169.254",
        "metadata.internal",
    ])
});

/// Headers a caller may not set
static BLOCKED_HEADERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "host",
        "authorization",
        "proxy-authorization",
        "cookie",
        "x-forwarded-for",
        "x-real-ip",
        "x-forwarded-host",
    ])
});

fn validate_url(url_str: &str) -> Result<Url> {
    let url =
        Url::parse(url_str).map_err(|e| Error::InvalidInput(format!("Invalid URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            warn!(scheme = %scheme, url = %url_str, "Blocked non-HTTP URL scheme");
            return Err(Error::PermissionDenied(format!(
                "URL scheme '{}' is not allowed. Only http/https are permitted.",
                scheme
            )));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidInput("URL has no host".to_string()))?
        .to_lowercase();

    if BLOCKED_HOSTS.contains(host.as_str()) {
        warn!(host = %host, "Blocked request to internal host");
        return Err(Error::PermissionDenied(format!(
            "Requests to '{}' are blocked for security reasons",
            host
        )));
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            warn!(ip = %ip, "Blocked request to private IP");
            return Err(Error::PermissionDenied(
                "Requests to private/internal IP addresses are not allowed".to_string(),
            ));
        }
    }

    if host.ends_with(".internal") || host.ends_with(".local") || host.ends_with(".localhost") {
        warn!(host = %host, "Blocked request to internal domain");
        return Err(Error::PermissionDenied(format!(
            "Requests to internal domains like '{}' are not allowed",
            host
        )));
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_documentation()
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => ipv6.is_loopback() || ipv6.is_unspecified(),
    }
}

fn is_header_blocked(header_name: &str) -> bool {
    BLOCKED_HEADERS.contains(header_name.to_lowercase().as_str())
}

/// Resolve the host right before the request so a rebinding DNS answer is caught.
fn validate_resolved_ips(url: &Url) -> Result<()> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidInput("URL has no host".to_string()))?;

    if host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let resolved: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Network(format!("DNS resolution failed for '{}': {}", host, e)))?
        .collect();

    if resolved.is_empty() {
        return Err(Error::Network(format!(
            "DNS resolution returned no addresses for '{}'",
            host
        )));
    }

    if let Some(addr) = resolved.iter().find(|a| is_private_ip(&a.ip())) {
        warn!(host = %host, resolved_ip = %addr.ip(), "Hostname resolved to private IP");
        return Err(Error::PermissionDenied(format!(
            "hostname '{}' resolved to private IP address {}",
            host,
            addr.ip()
        )));
    }

    Ok(())
}

/// Cut `body` to at most `max_bytes`, on a char boundary
fn cap_body(body: String, max_bytes: usize) -> (String, bool) {
    if body.len() <= max_bytes {
        return (body, false);
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    (body[..end].to_string(), true)
}

/// Tool for HTTP GET requests
pub struct HttpGetTool {
    definition: ToolDefinition,
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpGetTool {
    /// Create a new HTTP GET tool
    #[must_use]
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let definition = ToolDefinition::new(
            "http_get",
            "Make an HTTP GET request to a public URL. Returns status code and body text.",
        )
        .with_category(ToolCategory::Http)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to request"
                },
                "headers": {
                    "type": "object",
                    "description": "Additional headers to send",
                    "additionalProperties": {"type": "string"}
                }
            },
            "required": ["url"]
        }));

        Self {
            definition,
            client,
            max_bytes,
        }
    }
}

#[async_trait::async_trait]
impl Tool for HttpGetTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let url_str = input
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'url' parameter".to_string()))?;

        let validated_url = validate_url(url_str)?;
        validate_resolved_ips(&validated_url)?;

        debug!(url = %validated_url, "Making HTTP GET request");

        let mut request = self.client.get(validated_url.as_str());

        if let Some(headers) = input.get("headers").and_then(|v| v.as_object()) {
            for (key, value) in headers {
                if is_header_blocked(key) {
                    warn!(header = %key, "Blocked attempt to set sensitive header");
                    continue;
                }
                if let Some(v) = value.as_str() {
                    request = request.header(key, v);
                }
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let (body, truncated) = cap_body(body, self.max_bytes);

        Ok(ToolResult::success(
            serde_json::json!({
                "status": status,
                "body": body,
                "truncated": truncated,
                "url": url_str
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
