//! Mock LLM Provider for testing
//!
//! Responses come from a FIFO queue first, then from an optional handler
//! closure, then fall back to a fixed text reply. Every request is recorded.

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::Result;
use crate::provider::LlmProvider;
use crate::tools::ToolCall;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&ToolCompletionRequest) -> Result<ToolCompletionResponse> + Send + Sync;

/// A mock LLM provider that returns queued or computed responses.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<ToolCompletionResponse>>>>,
    handler: Option<Arc<Handler>>,
    requests: Arc<Mutex<Vec<ToolCompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            handler: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Compute responses with a closure once the queue is drained.
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ToolCompletionRequest) -> Result<ToolCompletionResponse> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Add a response to the queue.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.push(Ok(response));
    }

    /// Add an error to the queue.
    pub fn add_error(&self, error: crate::Error) {
        self.push(Err(error));
    }

    fn push(&self, item: Result<ToolCompletionResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    /// Number of completions requested so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot of every request received.
    #[must_use]
    pub fn requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Text-only response with a token count.
    #[must_use]
    pub fn text_response(content: impl Into<String>, total_tokens: u32) -> ToolCompletionResponse {
        let mut response = ToolCompletionResponse::text(content);
        response.model = "mock-model".to_string();
        response.usage = Some(crate::TokenUsage {
            prompt_tokens: 0,
            completion_tokens: total_tokens,
            total_tokens,
        });
        response
    }

    /// Response with a single tool call.
    #[must_use]
    pub fn tool_call_response(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> ToolCompletionResponse {
        let mut response = ToolCompletionResponse::with_tool_calls(vec![ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.to_string(),
        }]);
        response.model = "mock-model".to_string();
        response
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(item) = queued {
            return item;
        }

        if let Some(handler) = &self.handler {
            return handler(&request);
        }

        Ok(Self::text_response("mock response", 0))
    }
}
