//! Candidate - one strategy attempt, its lineage and (once run) its outcome

use crate::error::{Error, Result};
use crate::scores::{ScoreWeights, Scores};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One tool invocation made while executing a candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name
    pub tool_name: String,
    /// Parsed arguments
    pub arguments: serde_json::Value,
    /// Tool output (null on failure)
    pub result: serde_json::Value,
    /// Whether the tool succeeded
    pub success: bool,
    /// Error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record of one candidate run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Original query
    pub query: String,
    /// Tool calls in order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Reasoning fragments surfaced by the model
    pub reasoning: Vec<String>,
    /// Final answer text
    pub final_answer: String,
    /// Tokens across every response, retries included
    pub total_tokens: u64,
    /// Wall-clock duration
    pub duration_ms: u64,
}

impl ExecutionTrace {
    /// Tool calls that succeeded and produced output
    pub fn successful_tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls
            .iter()
            .filter(|tc| tc.success && !tc.result.is_null())
    }
}

/// A candidate strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// `path_<uuid>`
    pub id: String,
    /// Generation number, 0 for seeds
    pub generation: u32,
    /// 0 (seed), 1 (mutation) or 2 (crossover) parent ids
    pub parent_ids: Vec<String>,
    /// Strategy text placed in the system message
    pub strategy: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    lessons: Vec<String>,
    trace: Option<ExecutionTrace>,
    scores: Option<Scores>,
    feedback: String,
}

fn new_id() -> String {
    format!("path_{}", uuid::Uuid::new_v4())
}

impl Candidate {
    /// A generation-0 candidate with no parents and no lessons
    #[must_use]
    pub fn seed(strategy: impl Into<String>) -> Self {
        Self::offspring(0, Vec::new(), strategy, Vec::new())
    }

    /// A new unscored candidate
    #[must_use]
    pub fn offspring(
        generation: u32,
        parent_ids: Vec<String>,
        strategy: impl Into<String>,
        lessons: Vec<String>,
    ) -> Self {
        Self {
            id: new_id(),
            generation,
            parent_ids,
            strategy: strategy.into(),
            lessons: merge_lessons(&[], &lessons),
            created_at: Utc::now(),
            trace: None,
            scores: None,
            feedback: String::new(),
        }
    }

    /// Same strategy and lessons, run again one generation later
    #[must_use]
    pub fn rerun(&self) -> Self {
        Self::offspring(
            self.generation + 1,
            vec![self.id.clone()],
            self.strategy.clone(),
            self.lessons.clone(),
        )
    }

    /// Accumulated lessons, deduplicated ignoring case and surrounding whitespace
    #[must_use]
    pub fn lessons(&self) -> &[String] {
        &self.lessons
    }

    /// Merge more lessons in; duplicates of existing ones are skipped
    pub fn add_lessons(&mut self, incoming: &[String]) {
        self.lessons = merge_lessons(&self.lessons, incoming);
    }

    /// Attach the run's outcome. Fails if scores were already assigned.
    pub fn assign_evaluation(
        &mut self,
        trace: ExecutionTrace,
        scores: Scores,
        feedback: impl Into<String>,
    ) -> Result<()> {
        if self.scores.is_some() {
            return Err(Error::ScoresAlreadyAssigned);
        }
        self.trace = Some(trace);
        self.scores = Some(scores);
        self.feedback = feedback.into();
        Ok(())
    }

    /// Execution trace, once run
    #[must_use]
    pub fn trace(&self) -> Option<&ExecutionTrace> {
        self.trace.as_ref()
    }

    /// Scores, once evaluated
    #[must_use]
    pub fn scores(&self) -> Option<&Scores> {
        self.scores.as_ref()
    }

    /// Steering feedback from evaluation
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Weighted score, 0 when unscored
    #[must_use]
    pub fn weighted_score(&self, weights: &ScoreWeights) -> f64 {
        self.scores.map_or(0.0, |s| s.weighted_sum(weights))
    }

    /// Whether both are scored and `self` dominates `other`
    #[must_use]
    pub fn dominates(&self, other: &Candidate) -> bool {
        match (&self.scores, &other.scores) {
            (Some(a), Some(b)) => a.dominates(b),
            _ => false,
        }
    }
}

/// Append `incoming` to `existing`, skipping blanks and entries equal under
/// trim + lowercase. The first spelling seen wins.
#[must_use]
pub fn merge_lessons(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(incoming)
        .filter(|lesson| {
            let key = lesson.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_lessons_case_and_whitespace() {
        let merged = merge_lessons(&strings(&["A", "a "]), &strings(&["b"]));
        assert_eq!(merged, strings(&["A", "b"]));
    }

    #[test]
    fn test_merge_lessons_drops_blank_and_keeps_order() {
        let merged = merge_lessons(&strings(&["use tools", "  "]), &strings(&["Be brief", "USE TOOLS"]));
        assert_eq!(merged, strings(&["use tools", "Be brief"]));
    }

    #[test]
    fn test_add_lessons_keeps_list_deduplicated() {
        let mut c = Candidate::offspring(1, vec![], "s", strings(&["Cite sources", "cite sources "]));
        assert_eq!(c.lessons(), strings(&["Cite sources"]).as_slice());

        c.add_lessons(&strings(&["  CITE SOURCES", "Be brief", ""]));
        c.add_lessons(&strings(&["be brief"]));
        assert_eq!(c.lessons(), strings(&["Cite sources", "Be brief"]).as_slice());
    }

    #[test]
    fn test_seed_shape() {
        let c = Candidate::seed("strategy");
        assert!(c.id.starts_with("path_"));
        assert_eq!(c.generation, 0);
        assert!(c.parent_ids.is_empty());
        assert!(c.scores().is_none());
        assert!(c.trace().is_none());
    }

    #[test]
    fn test_scores_are_write_once() {
        let mut c = Candidate::seed("s");
        let scores = Scores::from_array([3.0; 6]);
        c.assign_evaluation(ExecutionTrace::default(), scores, "ok").unwrap();
        assert_eq!(c.feedback(), "ok");

        let again = c.assign_evaluation(ExecutionTrace::default(), Scores::from_array([5.0; 6]), "x");
        assert!(matches!(again, Err(Error::ScoresAlreadyAssigned)));
        assert_eq!(c.scores(), Some(&scores));
        assert_eq!(c.feedback(), "ok");
    }

    #[test]
    fn test_rerun_links_parent() {
        let mut parent = Candidate::offspring(1, vec![], "s", strings(&["l1"]));
        parent
            .assign_evaluation(ExecutionTrace::default(), Scores::from_array([2.0; 6]), "")
            .unwrap();

        let child = parent.rerun();
        assert_ne!(child.id, parent.id);
        assert_eq!(child.generation, 2);
        assert_eq!(child.parent_ids, vec![parent.id.clone()]);
        assert_eq!(child.lessons(), parent.lessons());
        assert!(child.scores().is_none());
    }

    #[test]
    fn test_successful_tool_calls_filter() {
        let trace = ExecutionTrace {
            tool_calls: vec![
                ToolCallRecord {
                    tool_name: "ok".into(),
                    arguments: serde_json::json!({}),
                    result: serde_json::json!({"v": 1}),
                    success: true,
                    error: None,
                },
                ToolCallRecord {
                    tool_name: "bad".into(),
                    arguments: serde_json::json!({}),
                    result: serde_json::Value::Null,
                    success: false,
                    error: Some("boom".into()),
                },
            ],
            ..Default::default()
        };
        let names: Vec<_> = trace.successful_tool_calls().map(|t| t.tool_name.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
    }
}
