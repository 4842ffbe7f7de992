//! Execution Engine - run one candidate through a bounded tool-calling loop
//!
//! The strategy and lessons become the system message. Each round either
//! ends with a plain-text answer or dispatches tool calls and feeds the
//! results back. Empty responses are retried along a temperature ladder.

use crate::candidate::{Candidate, ExecutionTrace, ToolCallRecord};
use crate::error::{Error, Result};
use evopath_llm::{
    CompletionRequest, LlmProvider, Message, MessageRole, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse, ToolDefinition,
};
use evopath_tools::ToolExecutor;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Name of the optional tool that carries the final answer
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Answer used when the budget runs out on an empty response
pub const MAX_ITERATIONS_PLACEHOLDER: &str = "Max tool iterations reached.";

/// Engine knobs, taken from the search configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Model name; empty means the provider default
    pub model: String,
    /// Sampling temperature for regular calls
    pub temperature: f32,
    /// Maximum generation rounds per candidate
    pub max_tool_iterations: usize,
    /// Temperatures tried, in order, after an empty response
    pub empty_retry_temperatures: Vec<f32>,
    /// Offer the `final_answer` tool
    pub final_answer_tool: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tool_iterations: 5,
            empty_retry_temperatures: vec![0.3, 0.7, 1.0],
            final_answer_tool: false,
        }
    }
}

/// What a candidate is run against
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// User query
    pub query: &'a str,
    /// Prior conversation
    pub history: &'a [Message],
    /// Tools the model may call
    pub tools: &'a [ToolDefinition],
}

/// Drives candidates against the generation service and tool executor
#[derive(Clone)]
pub struct ExecutionEngine {
    llm: Arc<dyn LlmProvider>,
    tools: Option<Arc<dyn ToolExecutor>>,
    settings: EngineSettings,
}

/// Definition of the `final_answer` tool
#[must_use]
pub fn final_answer_definition() -> ToolDefinition {
    ToolDefinition::new(
        FINAL_ANSWER_TOOL,
        "Submit the final answer to the user's question. Call this once you are done.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The complete answer shown to the user"
                }
            },
            "required": ["answer"]
        }),
    )
}

/// Build the message sequence for a candidate
#[must_use]
pub fn build_messages(candidate: &Candidate, history: &[Message], query: &str) -> Vec<Message> {
    let mut system = format!("## Approach Strategy\n{}", candidate.strategy);
    if !candidate.lessons().is_empty() {
        system.push_str("\n\n## Lessons from previous attempts");
        for lesson in candidate.lessons() {
            system.push_str("\n- ");
            system.push_str(lesson);
        }
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned(),
    );
    messages.push(Message::user(query));
    messages
}

fn render_output(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ExecutionEngine {
    /// Create an engine
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Option<Arc<dyn ToolExecutor>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            settings,
        }
    }

    /// Engine settings
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run `candidate` and return its trace
    #[instrument(skip(self, candidate, ctx, cancel), fields(candidate = %candidate.id, generation = candidate.generation))]
    pub async fn execute(
        &self,
        candidate: &Candidate,
        ctx: ExecutionContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionTrace> {
        let start = Instant::now();
        let mut messages = build_messages(candidate, ctx.history, ctx.query);
        let mut offered = ctx.tools.to_vec();
        if self.settings.final_answer_tool {
            offered.push(final_answer_definition());
        }

        let mut trace = ExecutionTrace {
            query: ctx.query.to_string(),
            ..Default::default()
        };
        let mut final_answer = None;
        let mut last_content = String::new();

        for iteration in 0..self.settings.max_tool_iterations.max(1) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let response = self
                .complete_non_empty(&messages, &offered, &mut trace.total_tokens, cancel)
                .await?;

            if let Some(reasoning) = response.reasoning.as_deref().map(str::trim) {
                if !reasoning.is_empty() {
                    trace.reasoning.push(reasoning.to_string());
                }
            }

            let content = response.content.clone().unwrap_or_default();
            if response.tool_calls.is_empty() {
                final_answer = Some(content);
                break;
            }

            debug!(iteration, calls = response.tool_calls.len(), "Model requested tools");
            messages.push(Message::assistant_with_tool_calls(
                content.clone(),
                response.tool_calls.clone(),
            ));
            last_content = content;

            if let Some(answer) = self.dispatch(&response.tool_calls, &mut messages, &mut trace).await? {
                final_answer = Some(answer);
                break;
            }
        }

        let answer = final_answer.unwrap_or_else(|| {
            warn!(candidate = %candidate.id, "Tool iteration budget exhausted");
            if last_content.trim().is_empty() {
                MAX_ITERATIONS_PLACEHOLDER.to_string()
            } else {
                last_content
            }
        });

        if answer.trim().is_empty() {
            return Err(Error::CandidateExecution("final answer is empty".to_string()));
        }

        trace.final_answer = answer;
        trace.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            candidate = %candidate.id,
            tool_calls = trace.tool_calls.len(),
            tokens = trace.total_tokens,
            duration_ms = trace.duration_ms,
            "Candidate executed"
        );
        Ok(trace)
    }

    /// Dispatch tool calls in order. Returns the answer if `final_answer` was called.
    async fn dispatch(
        &self,
        calls: &[ToolCall],
        messages: &mut Vec<Message>,
        trace: &mut ExecutionTrace,
    ) -> Result<Option<String>> {
        for call in calls {
            let arguments: serde_json::Value =
                serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                    warn!(
                        tool = %call.name,
                        error = %e,
                        arguments = %call.arguments,
                        "Failed to parse tool arguments, using empty object"
                    );
                    serde_json::json!({})
                });

            if self.settings.final_answer_tool && call.name == FINAL_ANSWER_TOOL {
                let answer = arguments
                    .get("answer")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|a| !a.is_empty());
                if let Some(answer) = answer {
                    return Ok(Some(answer.to_string()));
                }
                messages.push(
                    Message::tool_response(
                        call.id.clone(),
                        serde_json::json!({"error": "final_answer requires a non-empty 'answer'"})
                            .to_string(),
                    )
                    .with_name(&call.name),
                );
                continue;
            }

            let executor = self.tools.as_ref().ok_or_else(|| {
                Error::CandidateExecution(format!(
                    "tool '{}' requested but no tool executor is configured",
                    call.name
                ))
            })?;

            let record = match executor.invoke(&call.name, arguments.clone()).await {
                Ok(output) => ToolCallRecord {
                    tool_name: call.name.clone(),
                    arguments,
                    result: output,
                    success: true,
                    error: None,
                },
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    ToolCallRecord {
                        tool_name: call.name.clone(),
                        arguments,
                        result: serde_json::Value::Null,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };

            let content = match &record.error {
                None => render_output(&record.result),
                Some(err) => serde_json::json!({ "error": err }).to_string(),
            };
            messages.push(Message::tool_response(call.id.clone(), content).with_name(&call.name));
            trace.tool_calls.push(record);
        }
        Ok(None)
    }

    /// One generation call, then the retry ladder while responses stay empty
    async fn complete_non_empty(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        total_tokens: &mut u64,
        cancel: &CancellationToken,
    ) -> Result<ToolCompletionResponse> {
        let first = self
            .call(messages, tools, self.settings.temperature, cancel)
            .await?
            .map_err(|e| Error::CandidateExecution(format!("generation failed: {e}")))?;
        *total_tokens += first.total_tokens();
        if !first.is_empty() {
            return Ok(first);
        }

        for (attempt, &temperature) in self.settings.empty_retry_temperatures.iter().enumerate() {
            warn!(attempt = attempt + 1, temperature, "Empty response, retrying");
            match self.call(messages, tools, temperature, cancel).await? {
                Ok(response) => {
                    *total_tokens += response.total_tokens();
                    if !response.is_empty() {
                        return Ok(response);
                    }
                }
                Err(e) => warn!(temperature, error = %e, "Retry call failed"),
            }
        }

        Err(Error::CandidateExecution(format!(
            "empty response after {} retries",
            self.settings.empty_retry_temperatures.len()
        )))
    }

    /// Outer `Err` is cancellation; inner is the provider's result
    async fn call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        temperature: f32,
        cancel: &CancellationToken,
    ) -> Result<evopath_llm::Result<ToolCompletionResponse>> {
        let request = ToolCompletionRequest::new(
            CompletionRequest::new(self.settings.model.clone())
                .with_messages(messages.to_vec())
                .with_temperature(temperature),
            tools.to_vec(),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            response = self.llm.complete_with_tools(request) => Ok(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evopath_llm::MockProvider;

    fn engine(provider: &MockProvider, settings: EngineSettings) -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(provider.clone()), None, settings)
    }

    fn ctx<'a>(tools: &'a [ToolDefinition]) -> ExecutionContext<'a> {
        ExecutionContext {
            query: "what is 2+2",
            history: &[],
            tools,
        }
    }

    #[test]
    fn test_build_messages() {
        let candidate = Candidate::offspring(1, vec![], "Be direct", vec!["Check units".into()]);
        let history = vec![
            Message::system("old system prompt"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];

        let messages = build_messages(&candidate, &history, "what is 2+2");
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0].content,
            "## Approach Strategy\nBe direct\n\n## Lessons from previous attempts\n- Check units"
        );
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[3].role, MessageRole::User);
        assert_eq!(messages[3].content, "what is 2+2");

        let bare = build_messages(&Candidate::seed("S"), &[], "q");
        assert_eq!(bare[0].content, "## Approach Strategy\nS");
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = MockProvider::new();
        provider.add_tool_response(MockProvider::text_response("4", 12));

        let trace = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(trace.final_answer, "4");
        assert_eq!(trace.total_tokens, 12);
        assert_eq!(trace.query, "what is 2+2");
        let request = &provider.requests()[0];
        assert_eq!(request.request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_empty_ladder_recovers() {
        let provider = MockProvider::new();
        provider.add_tool_response(MockProvider::text_response("  ", 1));
        provider.add_tool_response(MockProvider::text_response("", 1));
        provider.add_tool_response(MockProvider::text_response("done", 1));

        let trace = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(trace.final_answer, "done");
        assert_eq!(trace.total_tokens, 3);
        let temps: Vec<_> = provider
            .requests()
            .iter()
            .map(|r| r.request.temperature)
            .collect();
        assert_eq!(temps, vec![Some(0.7), Some(0.3), Some(0.7)]);
    }

    #[tokio::test]
    async fn test_empty_ladder_exhausted() {
        let provider = MockProvider::new().with_handler(|_| Ok(MockProvider::text_response("", 0)));

        let err = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CandidateExecution(msg) if msg.contains("empty response")));
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_retry_error_continues_ladder() {
        let provider = MockProvider::new();
        provider.add_tool_response(MockProvider::text_response("", 0));
        provider.add_error(evopath_llm::Error::RateLimit);
        provider.add_tool_response(MockProvider::text_response("ok", 0));

        let trace = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(trace.final_answer, "ok");
    }

    #[tokio::test]
    async fn test_first_call_error_fails_candidate() {
        let provider = MockProvider::new();
        provider.add_error(evopath_llm::Error::Network("down".into()));

        let err = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CandidateExecution(_)));
    }

    #[tokio::test]
    async fn test_cancelled_during_ladder() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let provider = MockProvider::new().with_handler(move |_| {
            trigger.cancel();
            Ok(MockProvider::text_response("", 0))
        });

        let err = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_without_executor_fails() {
        let provider = MockProvider::new();
        provider.add_tool_response(MockProvider::tool_call_response(
            "call_0",
            "lookup",
            serde_json::json!({}),
        ));

        let err = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CandidateExecution(msg) if msg.contains("no tool executor")));
    }

    #[tokio::test]
    async fn test_budget_exhausted_uses_placeholder() {
        let provider = MockProvider::new().with_handler(|_| {
            Ok(MockProvider::tool_call_response(
                "call_0",
                FINAL_ANSWER_TOOL,
                serde_json::json!({"answer": ""}),
            ))
        });
        let settings = EngineSettings {
            max_tool_iterations: 2,
            final_answer_tool: true,
            ..Default::default()
        };

        let trace = engine(&provider, settings)
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(trace.final_answer, MAX_ITERATIONS_PLACEHOLDER);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_final_answer_tool() {
        let provider = MockProvider::new();
        provider.add_tool_response(MockProvider::tool_call_response(
            "call_0",
            FINAL_ANSWER_TOOL,
            serde_json::json!({"answer": "Four."}),
        ));
        let settings = EngineSettings {
            final_answer_tool: true,
            ..Default::default()
        };

        let trace = engine(&provider, settings)
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(trace.final_answer, "Four.");
        assert!(trace.tool_calls.is_empty());

        let offered: Vec<_> = provider.requests()[0]
            .tools
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(offered, vec![FINAL_ANSWER_TOOL.to_string()]);
    }

    #[tokio::test]
    async fn test_reasoning_collected() {
        let provider = MockProvider::new();
        let mut response = MockProvider::text_response("4", 1);
        response.reasoning = Some("two plus two".into());
        provider.add_tool_response(response);

        let trace = engine(&provider, EngineSettings::default())
            .execute(&Candidate::seed("s"), ctx(&[]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(trace.reasoning, vec!["two plus two".to_string()]);
    }
}
