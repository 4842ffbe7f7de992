//! Search configuration

use crate::archive::DEFAULT_ARCHIVE_CAPACITY;
use crate::engine::EngineSettings;
use crate::error::{Error, Result};
use crate::scores::{MAX_STARS, MIN_STARS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs for one search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of generations
    pub generation_count: u32,
    /// Seeds in generation 0, and parents selected per generation
    pub candidates_per_generation: usize,
    /// Weighted score that ends the search early
    pub target_score: f64,
    /// Archive capacity
    pub archive_capacity: usize,
    /// Cross over the top two parents each generation
    pub enable_crossover: bool,
    /// Generation rounds per candidate
    pub max_tool_iterations: usize,
    /// Sampling temperature for candidate execution
    pub temperature: f32,
    /// Retry temperatures after an empty response
    pub empty_retry_temperatures: Vec<f32>,
    /// End-to-end deadline in seconds
    pub deadline_secs: u64,
    /// Offer the `final_answer` tool to candidates
    pub final_answer_tool: bool,
    /// Model name, empty for the provider default
    pub model: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            generation_count: 3,
            candidates_per_generation: 3,
            target_score: 4.0,
            archive_capacity: DEFAULT_ARCHIVE_CAPACITY,
            enable_crossover: true,
            max_tool_iterations: 5,
            temperature: 0.7,
            empty_retry_temperatures: vec![0.3, 0.7, 1.0],
            deadline_secs: 300,
            final_answer_tool: false,
            model: String::new(),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        field: field.to_string(),
        message: message.into(),
    }
}

impl SearchConfig {
    /// Set the generation count
    #[must_use]
    pub fn with_generations(mut self, generation_count: u32) -> Self {
        self.generation_count = generation_count;
        self
    }

    /// Set candidates per generation
    #[must_use]
    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates_per_generation = candidates;
        self
    }

    /// Set the target score
    #[must_use]
    pub fn with_target_score(mut self, target: f64) -> Self {
        self.target_score = target;
        self
    }

    /// Enable or disable crossover
    #[must_use]
    pub fn with_crossover(mut self, enabled: bool) -> Self {
        self.enable_crossover = enabled;
        self
    }

    /// Set the deadline
    #[must_use]
    pub fn with_deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = secs;
        self
    }

    /// Deadline as a duration
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Reject values the search cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.generation_count == 0 {
            return Err(invalid("generation_count", "must be at least 1"));
        }
        if self.candidates_per_generation == 0 {
            return Err(invalid("candidates_per_generation", "must be at least 1"));
        }
        if !(MIN_STARS..=MAX_STARS).contains(&self.target_score) {
            return Err(invalid(
                "target_score",
                format!("must be within {MIN_STARS}..={MAX_STARS}"),
            ));
        }
        if self.max_tool_iterations == 0 {
            return Err(invalid("max_tool_iterations", "must be at least 1"));
        }
        if self.deadline_secs == 0 {
            return Err(invalid("deadline_secs", "must be greater than zero"));
        }
        let mut temps = std::iter::once(&self.temperature).chain(&self.empty_retry_temperatures);
        if temps.any(|t| !(0.0..=2.0).contains(t)) {
            return Err(invalid("temperature", "temperatures must be within 0.0..=2.0"));
        }
        Ok(())
    }

    /// Execution engine settings
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tool_iterations: self.max_tool_iterations,
            empty_retry_temperatures: self.empty_retry_temperatures.clone(),
            final_answer_tool: self.final_answer_tool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.archive_capacity, 50);
        assert_eq!(config.deadline(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            (SearchConfig::default().with_generations(0), "generation_count"),
            (SearchConfig::default().with_candidates(0), "candidates_per_generation"),
            (SearchConfig::default().with_target_score(5.5), "target_score"),
            (SearchConfig::default().with_deadline_secs(0), "deadline_secs"),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidConfig for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"generation_count": 1, "enable_crossover": false}"#).unwrap();
        assert_eq!(config.generation_count, 1);
        assert!(!config.enable_crossover);
        assert_eq!(config.candidates_per_generation, 3);
    }
}
