//! Rule-based steering feedback from scores

use crate::scores::{Dimension, Scores};

const STRONG: f64 = 2.5;
const MILD: f64 = 3.5;
const HEURISTIC: f64 = 2.0;

/// Feedback when nothing fell below a threshold
pub const ALL_GOOD: &str = "Good execution with solid results.";

fn message(dimension: Dimension, value: f64) -> Option<&'static str> {
    match dimension {
        Dimension::Effectiveness if value < STRONG => {
            Some("Failed to answer the question - need a completely different approach.")
        }
        Dimension::Effectiveness if value < MILD => {
            Some("Partially answered - need to address the question more directly.")
        }
        Dimension::AnswerQuality if value < STRONG => {
            Some("Answer quality is poor - improve clarity and organization.")
        }
        Dimension::AnswerQuality if value < MILD => {
            Some("Answer quality is mediocre - could be clearer or more helpful.")
        }
        Dimension::Hallucination if value < STRONG => {
            Some("Significant hallucination detected - stick strictly to tool output facts.")
        }
        Dimension::Hallucination if value < MILD => {
            Some("Some unsupported claims - be more careful about factual accuracy.")
        }
        Dimension::Specificity if value < STRONG => {
            Some("Wrong level of detail - adjust specificity to match the question.")
        }
        Dimension::Specificity if value < MILD => {
            Some("Detail level could be better calibrated to the question.")
        }
        Dimension::TokenCost if value < HEURISTIC => Some("Very high token usage - be more concise."),
        Dimension::Latency if value < HEURISTIC => {
            Some("Very slow execution - find a more direct approach.")
        }
        _ => None,
    }
}

/// Compose feedback in dimension order, space-joined
#[must_use]
pub fn compose_feedback(scores: &Scores) -> String {
    let parts: Vec<&str> = Dimension::ALL
        .iter()
        .filter_map(|&dim| message(dim, scores.get(dim)))
        .collect();

    if parts.is_empty() {
        ALL_GOOD.to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_good() {
        assert_eq!(compose_feedback(&Scores::from_array([4.0; 6])), ALL_GOOD);
        // exactly on a threshold is not below it
        assert_eq!(
            compose_feedback(&Scores::from_array([3.5, 3.5, 3.5, 3.5, 2.0, 2.0])),
            ALL_GOOD
        );
    }

    #[test]
    fn test_strong_and_mild_in_order() {
        let scores = Scores::from_array([2.0, 3.0, 4.0, 4.0, 1.5, 4.0]);
        assert_eq!(
            compose_feedback(&scores),
            "Failed to answer the question - need a completely different approach. \
             Answer quality is mediocre - could be clearer or more helpful. \
             Very high token usage - be more concise."
        );
    }

    #[test]
    fn test_latency_only() {
        let scores = Scores::from_array([5.0, 5.0, 5.0, 5.0, 5.0, 1.9]);
        assert_eq!(
            compose_feedback(&scores),
            "Very slow execution - find a more direct approach."
        );
    }
}
