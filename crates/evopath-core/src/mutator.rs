//! Mutator - produce offspring strategies from scored parents
//!
//! Both operations force a structured tool call from the generation service.
//! Any failure (transport, missing call, malformed arguments) resolves to a
//! deterministic fallback, so neither operation can fail.

use crate::candidate::{merge_lessons, Candidate, ExecutionTrace};
use crate::evaluator::truncate_for_prompt;
use evopath_llm::{
    CompletionRequest, LlmProvider, Message, ToolChoice, ToolCompletionRequest, ToolDefinition,
};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const MUTATE_TOOL: &str = "mutate_result";
const CROSSOVER_TOOL: &str = "crossover_result";

#[derive(Debug, Deserialize)]
struct MutateResult {
    #[serde(default)]
    lessons: Vec<String>,
    improved_strategy: String,
}

#[derive(Debug, Deserialize)]
struct CrossoverResult {
    merged_strategy: String,
}

/// Strategy used when mutation gets no usable response
#[must_use]
pub fn mutation_fallback(strategy: &str, feedback: &str) -> String {
    format!("{strategy}\n\nAdditional guidance based on previous attempt: {feedback}")
}

/// Strategy used when crossover gets no usable response
#[must_use]
pub fn crossover_fallback(a: &str, b: &str) -> String {
    format!("Combined approach:\n\nFrom strategy 1:\n{a}\n\nFrom strategy 2:\n{b}")
}

/// Render a trace for the mutation prompt
#[must_use]
pub fn render_trace(trace: &ExecutionTrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query: {}", trace.query);
    let _ = writeln!(out, "Duration: {}ms", trace.duration_ms);
    let _ = writeln!(out, "Total Tokens: {}", trace.total_tokens);

    if !trace.reasoning.is_empty() {
        out.push_str("\nReasoning Steps:\n");
        for (i, step) in trace.reasoning.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, truncate_for_prompt(step, 500));
        }
    }

    if !trace.tool_calls.is_empty() {
        out.push_str("\nTool Calls:\n");
        for (i, call) in trace.tool_calls.iter().enumerate() {
            let status = match &call.error {
                Some(err) if !call.success => format!("FAILED: {err}"),
                _ => "OK".to_string(),
            };
            let _ = writeln!(out, "{}. {} [{}]", i + 1, call.tool_name, status);
            let _ = writeln!(out, "   Arguments: {}", call.arguments);
            if call.success {
                let result = match &call.result {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = writeln!(out, "   Result: {}", truncate_for_prompt(&result, 500));
            }
        }
    }

    let _ = write!(
        out,
        "\nFinal Answer:\n{}",
        truncate_for_prompt(&trace.final_answer, 500)
    );
    out
}

fn mutate_tool() -> ToolDefinition {
    ToolDefinition::new(
        MUTATE_TOOL,
        "Report lessons learned and an improved strategy",
        serde_json::json!({
            "type": "object",
            "properties": {
                "lessons": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Short, reusable lessons from this attempt"
                },
                "improved_strategy": {
                    "type": "string",
                    "description": "The complete improved strategy text"
                }
            },
            "required": ["lessons", "improved_strategy"]
        }),
    )
}

fn crossover_tool() -> ToolDefinition {
    ToolDefinition::new(
        CROSSOVER_TOOL,
        "Report the merged strategy",
        serde_json::json!({
            "type": "object",
            "properties": {
                "merged_strategy": {
                    "type": "string",
                    "description": "One strategy combining the strengths of both"
                }
            },
            "required": ["merged_strategy"]
        }),
    )
}

/// Strategy mutator and crossover operator
#[derive(Clone)]
pub struct Mutator {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl Mutator {
    /// Create a mutator; an empty model means the provider default
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Improve `parent`'s strategy from its trace and feedback
    #[instrument(skip(self, parent, trace, feedback), fields(parent = %parent.id))]
    pub async fn mutate(&self, parent: &Candidate, trace: &ExecutionTrace, feedback: &str) -> Candidate {
        let prompt = format!(
            "You are improving the strategy an assistant follows when answering questions.\n\n\
             ## Current Strategy\n{strategy}\n\n\
             ## Execution Trace\n{trace}\n\n\
             ## Feedback\n{feedback}\n\n\
             Extract short lessons from this attempt and write an improved strategy \
             that addresses the feedback. Call {MUTATE_TOOL} with the result.",
            strategy = parent.strategy,
            trace = render_trace(trace),
        );

        let (strategy, learned) = match self.structured::<MutateResult>(&prompt, mutate_tool()).await {
            Some(result) if !result.improved_strategy.trim().is_empty() => {
                (result.improved_strategy, result.lessons)
            }
            _ => {
                warn!(parent = %parent.id, "Mutation fell back to appended feedback");
                (mutation_fallback(&parent.strategy, feedback), Vec::new())
            }
        };

        let mut child = Candidate::offspring(
            parent.generation + 1,
            vec![parent.id.clone()],
            strategy,
            parent.lessons().to_vec(),
        );
        child.add_lessons(&learned);
        debug!(child = %child.id, lessons = child.lessons().len(), "Mutation produced offspring");
        child
    }

    /// Merge two parents into one strategy
    #[instrument(skip(self, a, b), fields(a = %a.id, b = %b.id))]
    pub async fn crossover(&self, a: &Candidate, b: &Candidate) -> Candidate {
        let prompt = format!(
            "Combine the strengths of two strategies into one.\n\n\
             ## Strategy 1\n{a}\n\n## Strategy 2\n{b}\n\n\
             Call {CROSSOVER_TOOL} with a single merged strategy.",
            a = a.strategy,
            b = b.strategy,
        );

        let strategy = match self.structured::<CrossoverResult>(&prompt, crossover_tool()).await {
            Some(result) if !result.merged_strategy.trim().is_empty() => result.merged_strategy,
            _ => {
                warn!("Crossover fell back to concatenation");
                crossover_fallback(&a.strategy, &b.strategy)
            }
        };

        Candidate::offspring(
            a.generation.max(b.generation) + 1,
            vec![a.id.clone(), b.id.clone()],
            strategy,
            merge_lessons(a.lessons(), b.lessons()),
        )
    }

    /// Force `tool` and parse its arguments; `None` on any failure
    async fn structured<T: serde::de::DeserializeOwned>(
        &self,
        prompt: &str,
        tool: ToolDefinition,
    ) -> Option<T> {
        let name = tool.name.clone();
        let request = ToolCompletionRequest::new(
            CompletionRequest::new(self.model.clone()).with_message(Message::user(prompt)),
            vec![tool],
        )
        .with_tool_choice(ToolChoice::Tool(name.clone()));

        let response = match self.llm.complete_with_tools(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(tool = %name, error = %e, "Structured call failed");
                return None;
            }
        };

        let call = response.tool_calls.iter().find(|c| c.name == name)?;
        call.parse_arguments::<T>()
            .map_err(|e| warn!(tool = %name, error = %e, "Malformed structured response"))
            .ok()
    }
}
