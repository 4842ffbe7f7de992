//! Scores - six-dimension star ratings and Pareto dominance

use serde::{Deserialize, Serialize};

/// Lowest star rating
pub const MIN_STARS: f64 = 1.0;
/// Highest star rating
pub const MAX_STARS: f64 = 5.0;

/// Clamp a rating into `[MIN_STARS, MAX_STARS]`
#[must_use]
pub fn clamp_stars(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_STARS;
    }
    value.clamp(MIN_STARS, MAX_STARS)
}

/// One scored dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Did the answer address the question
    Effectiveness,
    /// Clarity and helpfulness of the answer
    AnswerQuality,
    /// Fidelity to tool output (higher = fewer unsupported claims)
    Hallucination,
    /// Level of detail matches the question
    Specificity,
    /// Token spend, heuristic
    TokenCost,
    /// Wall-clock duration, heuristic
    Latency,
}

impl Dimension {
    /// All dimensions in canonical order
    pub const ALL: [Dimension; 6] = [
        Dimension::Effectiveness,
        Dimension::AnswerQuality,
        Dimension::Hallucination,
        Dimension::Specificity,
        Dimension::TokenCost,
        Dimension::Latency,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Effectiveness => "effectiveness",
            Self::AnswerQuality => "answer_quality",
            Self::Hallucination => "hallucination",
            Self::Specificity => "specificity",
            Self::TokenCost => "token_cost",
            Self::Latency => "latency",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Star ratings for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Effectiveness
    pub effectiveness: f64,
    /// Answer quality
    pub answer_quality: f64,
    /// Hallucination (fidelity)
    pub hallucination: f64,
    /// Specificity
    pub specificity: f64,
    /// Token cost
    pub token_cost: f64,
    /// Latency
    pub latency: f64,
}

impl Scores {
    /// Build from values in canonical dimension order
    #[must_use]
    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            effectiveness: values[0],
            answer_quality: values[1],
            hallucination: values[2],
            specificity: values[3],
            token_cost: values[4],
            latency: values[5],
        }
    }

    /// Values in canonical dimension order
    #[must_use]
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.effectiveness,
            self.answer_quality,
            self.hallucination,
            self.specificity,
            self.token_cost,
            self.latency,
        ]
    }

    /// Value of one dimension
    #[must_use]
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Effectiveness => self.effectiveness,
            Dimension::AnswerQuality => self.answer_quality,
            Dimension::Hallucination => self.hallucination,
            Dimension::Specificity => self.specificity,
            Dimension::TokenCost => self.token_cost,
            Dimension::Latency => self.latency,
        }
    }

    /// `self` is at least as good everywhere and strictly better somewhere
    #[must_use]
    pub fn dominates(&self, other: &Scores) -> bool {
        let mut strictly_better = false;
        for dim in Dimension::ALL {
            let (a, b) = (self.get(dim), other.get(dim));
            if a < b {
                return false;
            }
            if a > b {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Dot product with the given weights
    #[must_use]
    pub fn weighted_sum(&self, weights: &ScoreWeights) -> f64 {
        Dimension::ALL
            .iter()
            .map(|&dim| self.get(dim) * weights.get(dim))
            .sum()
    }
}

/// Ranking weights per dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Effectiveness weight
    pub effectiveness: f64,
    /// Answer quality weight
    pub answer_quality: f64,
    /// Hallucination weight
    pub hallucination: f64,
    /// Specificity weight
    pub specificity: f64,
    /// Token cost weight
    pub token_cost: f64,
    /// Latency weight
    pub latency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            effectiveness: 0.35,
            answer_quality: 0.25,
            hallucination: 0.20,
            specificity: 0.10,
            token_cost: 0.05,
            latency: 0.05,
        }
    }
}

impl ScoreWeights {
    /// Weight of one dimension
    #[must_use]
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Effectiveness => self.effectiveness,
            Dimension::AnswerQuality => self.answer_quality,
            Dimension::Hallucination => self.hallucination,
            Dimension::Specificity => self.specificity,
            Dimension::TokenCost => self.token_cost,
            Dimension::Latency => self.latency,
        }
    }
}
