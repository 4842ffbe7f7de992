//! Seed strategy library for generation 0

use crate::candidate::Candidate;

/// A named starting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedStrategy {
    /// Template name
    pub name: &'static str,
    /// Strategy text
    pub text: &'static str,
}

/// The seed templates, in assignment order
pub const SEED_STRATEGIES: [SeedStrategy; 5] = [
    SeedStrategy {
        name: "default",
        text: "You are solving a query task.\n\
               1. First understand what information is needed\n\
               2. Identify relevant data sources and relationships\n\
               3. Construct appropriate queries or tool calls\n\
               4. Verify results make sense before concluding\n\
               5. Synthesize findings into a clear, accurate answer",
    },
    SeedStrategy {
        name: "methodical",
        text: "Approach this query methodically:\n\
               1. Break down the question into sub-questions\n\
               2. Address each sub-question with targeted tool use\n\
               3. Combine partial answers into a coherent response\n\
               4. Double-check for consistency",
    },
    SeedStrategy {
        name: "efficiency",
        text: "Focus on efficiency:\n\
               1. Identify the most direct path to the answer\n\
               2. Use minimal tool calls - prefer broader queries over multiple narrow ones\n\
               3. Avoid redundant operations\n\
               4. Provide a concise, accurate answer",
    },
    SeedStrategy {
        name: "accuracy",
        text: "Prioritize accuracy:\n\
               1. Gather comprehensive information first\n\
               2. Cross-reference data from multiple sources when possible\n\
               3. Be explicit about uncertainty\n\
               4. Prefer verified facts over inferences",
    },
    SeedStrategy {
        name: "step_by_step",
        text: "Think step by step:\n\
               1. What is the user really asking?\n\
               2. What information do I need?\n\
               3. What's the best way to get it?\n\
               4. How do I present the answer clearly?",
    },
];

/// `n` generation-0 candidates, templates assigned round-robin
#[must_use]
pub fn seed_candidates(n: usize) -> Vec<Candidate> {
    SEED_STRATEGIES
        .iter()
        .cycle()
        .take(n)
        .map(|seed| Candidate::seed(seed.text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let seeds = seed_candidates(7);
        assert_eq!(seeds.len(), 7);
        assert_eq!(seeds[0].strategy, SEED_STRATEGIES[0].text);
        assert_eq!(seeds[5].strategy, SEED_STRATEGIES[0].text);
        assert_eq!(seeds[6].strategy, SEED_STRATEGIES[1].text);
        assert!(seeds.iter().all(|c| c.generation == 0 && c.parent_ids.is_empty()));
    }

    #[test]
    fn test_template_text_is_line_broken() {
        assert!(SEED_STRATEGIES[0]
            .text
            .starts_with("You are solving a query task.\n1. First understand"));
        assert_eq!(seed_candidates(0).len(), 0);
    }
}
