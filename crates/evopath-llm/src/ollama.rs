//! Ollama - Local Ollama API provider
//!
//! Talks to the `/api/chat` endpoint of a local Ollama daemon. Tool calls,
//! forced tool choice and the `thinking` channel are mapped onto the
//! crate's request/response types.

use crate::completion::{TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::provider::LlmProvider;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Sanitize API error messages to prevent leaking sensitive information
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("/home")
        || lower.contains("/root")
        || lower.contains("/var")
        || lower.contains("\\users\\")
    {
        return "An internal error occurred. Please check your Ollama installation.".to_string();
    }

    if lower.contains("connection refused") || lower.contains("failed to connect") {
        return "Failed to connect to Ollama. Is Ollama running?".to_string();
    }

    if lower.contains("model") && (lower.contains("not found") || lower.contains("pull")) {
        return "Model not available. Please pull the model first with: ollama pull <model>"
            .to_string();
    }

    if error.len() < 100 {
        return error.to_string();
    }

    "An error occurred. Please try again.".to_string()
}

/// Default Ollama model
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default Ollama API URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    message: ResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (default: http://localhost:11434)
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Default max tokens
    pub default_max_tokens: u32,
    /// Request timeout (longer for local inference)
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 4096,
            timeout: Duration::from_secs(300),
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the default max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ollama local provider
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role.as_str(),
                content: msg.content.clone(),
                tool_calls: if msg.role == MessageRole::Assistant {
                    msg.tool_calls
                        .iter()
                        .map(|tc| WireToolCall {
                            function: WireFunctionCall {
                                name: tc.name.clone(),
                                arguments: serde_json::from_str(&tc.arguments)
                                    .unwrap_or_else(|_| serde_json::json!({})),
                            },
                        })
                        .collect()
                } else {
                    Vec::new()
                },
            })
            .collect()
    }

    /// Ollama has no `tool_choice`; forcing is done by narrowing the offered tools.
    fn convert_tools(tools: &[ToolDefinition], choice: &ToolChoice) -> Vec<WireTool> {
        tools
            .iter()
            .filter(|tool| match choice {
                ToolChoice::None => false,
                ToolChoice::Tool(name) => &tool.name == name,
                ToolChoice::Auto | ToolChoice::Required => true,
            })
            .map(|tool| WireTool {
                r#type: "function",
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }

    async fn send_request(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.config.base_url);

        debug!(model = %request.model, "Sending request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Network(format!(
                        "Failed to connect to Ollama at {}. Is Ollama running?",
                        self.config.base_url
                    ))
                } else if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if status.as_u16() == 429 {
            return Err(Error::RateLimit);
        }

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorBody>(&body) {
                return Err(Error::Api(sanitize_api_error(&error.error)));
            }
            return Err(Error::Api(sanitize_api_error(&format!(
                "HTTP {}: {}",
                status, body
            ))));
        }

        Self::parse_response(&body)
    }

    fn parse_response(body: &str) -> Result<ChatResponse> {
        serde_json::from_str(body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    fn into_completion(response: ChatResponse) -> ToolCompletionResponse {
        let tool_calls = response
            .message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, tc)| ToolCall {
                id: format!("call_{}", i),
                name: tc.function.name,
                arguments: tc.function.arguments.to_string(),
            })
            .collect();

        let content = Some(response.message.content).filter(|c| !c.is_empty());
        let reasoning = response.message.thinking.filter(|t| !t.trim().is_empty());

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt = prompt.unwrap_or(0);
                let completion = completion.unwrap_or(0);
                Some(TokenUsage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt + completion,
                })
            }
        };

        ToolCompletionResponse {
            content,
            reasoning,
            tool_calls,
            usage,
            finish_reason: response.done_reason,
            model: response.model,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.request.model, tools = request.tools.len()))]
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let model = if request.request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.request.model.clone()
        };

        let chat = ChatRequest {
            model,
            messages: Self::convert_messages(&request.request.messages),
            options: Some(ChatOptions {
                temperature: request.request.temperature,
                num_predict: request
                    .request
                    .max_tokens
                    .or(Some(self.config.default_max_tokens)),
                stop: request.request.stop.clone(),
            }),
            stream: false,
            tools: Self::convert_tools(&request.tools, &request.tool_choice),
        };

        let response = self.send_request(chat).await?;
        Ok(Self::into_completion(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OllamaConfig::new()
            .with_model("mistral")
            .with_base_url("http://192.168.1.100:11434/")
            .with_max_tokens(2048)
            .with_timeout(Duration::from_secs(120));

        assert_eq!(config.default_model, "mistral");
        assert_eq!(config.base_url, "http://192.168.1.100:11434");
        assert_eq!(config.default_max_tokens, 2048);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_forced_tool_narrows_offer() {
        let tools = vec![
            ToolDefinition::new("a", "A", serde_json::json!({})),
            ToolDefinition::new("b", "B", serde_json::json!({})),
        ];

        let forced = OllamaProvider::convert_tools(&tools, &ToolChoice::Tool("b".to_string()));
        assert_eq!(forced.len(), 1);
        assert_eq!(forced[0].function.name, "b");

        assert!(OllamaProvider::convert_tools(&tools, &ToolChoice::None).is_empty());
        assert_eq!(OllamaProvider::convert_tools(&tools, &ToolChoice::Auto).len(), 2);
    }

    #[test]
    fn test_assistant_tool_calls_round_trip_to_wire() {
        let call = ToolCall {
            id: "call_0".to_string(),
            name: "lookup".to_string(),
            arguments: r#"{"q":"x"}"#.to_string(),
        };
        let messages = vec![
            Message::user("hi"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_response("call_0", "result").with_name("lookup"),
        ];

        let converted = OllamaProvider::convert_messages(&messages);
        assert_eq!(converted[1].role, "assistant");
        assert_eq!(converted[1].tool_calls.len(), 1);
        assert_eq!(converted[1].tool_calls[0].function.arguments["q"], "x");
        assert_eq!(converted[2].role, "tool");
        assert!(converted[2].tool_calls.is_empty());
    }

    #[test]
    fn test_parse_response_with_thinking_and_tools() {
        let body = r#"{
            "model": "qwen3",
            "message": {
                "role": "assistant",
                "content": "",
                "thinking": "let me look that up",
                "tool_calls": [{"function": {"name": "lookup", "arguments": {"q": "rust"}}}]
            },
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 12,
            "eval_count": 8
        }"#;

        let response = OllamaProvider::into_completion(OllamaProvider::parse_response(body).unwrap());
        assert!(response.content.is_none());
        assert_eq!(response.reasoning.as_deref(), Some("let me look that up"));
        assert_eq!(response.tool_calls[0].id, "call_0");
        assert_eq!(response.tool_calls[0].name, "lookup");
        assert_eq!(response.total_tokens(), 20);
    }

    #[test]
    fn test_sanitize_api_error() {
        let sanitized = sanitize_api_error("Error loading model from /home/user/.ollama/models");
        assert!(!sanitized.contains("/home"));

        let sanitized = sanitize_api_error("connection refused");
        assert!(sanitized.contains("Ollama running"));

        let sanitized = sanitize_api_error("model 'llama3' not found");
        assert!(sanitized.contains("pull"));
    }
}
