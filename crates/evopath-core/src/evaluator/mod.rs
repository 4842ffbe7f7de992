//! Evaluator - score a trace on six dimensions and produce steering feedback
//!
//! Token cost and latency are heuristic. The four quality dimensions are
//! judged by the generation service, concurrently, each retried once. A
//! dimension that still fails fails the whole evaluation.

mod feedback;
mod heuristics;
mod judge;

pub use feedback::{compose_feedback, ALL_GOOD};
pub use heuristics::{
    latency_score, token_cost_score, DecayCurve, LATENCY_CURVE, TOKEN_COST_CURVE,
};
pub use judge::{format_tool_outputs, parse_star_rating, truncate_for_prompt};

use crate::candidate::ExecutionTrace;
use crate::error::{Error, Result};
use crate::scores::{Dimension, Scores};
use evopath_llm::{CompletionRequest, LlmProvider, Message, ToolCompletionRequest};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Hallucination score when there is no tool output to check against
pub const NO_TOOL_OUTPUT_FIDELITY: f64 = 4.0;

/// Scores plus feedback for one trace
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Six-dimension scores
    pub scores: Scores,
    /// Rule-based feedback for the mutator
    pub feedback: String,
}

/// LLM-judged evaluator
#[derive(Clone)]
pub struct Evaluator {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl Evaluator {
    /// Create an evaluator; an empty model means the provider default
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Score `trace` as an answer to `query`
    #[instrument(skip(self, query, trace), fields(tokens = trace.total_tokens, duration_ms = trace.duration_ms))]
    pub async fn evaluate(&self, query: &str, trace: &ExecutionTrace) -> Result<Evaluation> {
        let (effectiveness, answer_quality, hallucination, specificity) = tokio::join!(
            self.judge(Dimension::Effectiveness, query, trace),
            self.judge(Dimension::AnswerQuality, query, trace),
            self.judge_fidelity(query, trace),
            self.judge(Dimension::Specificity, query, trace),
        );

        let scores = Scores {
            effectiveness: effectiveness?,
            answer_quality: answer_quality?,
            hallucination: hallucination?,
            specificity: specificity?,
            token_cost: token_cost_score(trace.total_tokens),
            latency: latency_score(trace.duration_ms),
        };
        let feedback = compose_feedback(&scores);

        debug!(?scores, feedback = %feedback, "Trace evaluated");
        Ok(Evaluation { scores, feedback })
    }

    async fn judge_fidelity(&self, query: &str, trace: &ExecutionTrace) -> Result<f64> {
        if trace.successful_tool_calls().next().is_none() {
            return Ok(NO_TOOL_OUTPUT_FIDELITY);
        }
        self.judge(Dimension::Hallucination, query, trace).await
    }

    async fn judge(&self, dimension: Dimension, query: &str, trace: &ExecutionTrace) -> Result<f64> {
        let prompt = judge::judge_prompt(dimension, query, trace).ok_or_else(|| Error::Evaluation {
            dimension: dimension.to_string(),
            message: "dimension is not judged".to_string(),
        })?;

        let mut last_problem = String::new();
        for attempt in 1..=2 {
            match self.ask(&prompt).await {
                Ok(reply) => match parse_star_rating(&reply) {
                    Some(stars) => return Ok(stars),
                    None => {
                        last_problem = format!(
                            "unparsable rating: {}",
                            truncate_for_prompt(reply.trim(), 100)
                        );
                    }
                },
                Err(e) => last_problem = e.to_string(),
            }
            warn!(dimension = %dimension, attempt, problem = %last_problem, "Judge call failed");
        }

        Err(Error::Evaluation {
            dimension: dimension.to_string(),
            message: last_problem,
        })
    }

    async fn ask(&self, prompt: &str) -> evopath_llm::Result<String> {
        let request = ToolCompletionRequest::new(
            CompletionRequest::new(self.model.clone()).with_message(Message::user(prompt)),
            Vec::new(),
        );
        let response = self.llm.complete_with_tools(request).await?;
        Ok(response.content.unwrap_or_default())
    }
}
