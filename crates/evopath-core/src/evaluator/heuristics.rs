//! Heuristic scores for token cost and latency

use crate::scores::{MAX_STARS, MIN_STARS};

/// `(max - floor) * exp(-x / k) + floor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayCurve {
    /// Score at zero input
    pub max: f64,
    /// Asymptote as input grows
    pub floor: f64,
    /// Decay constant, in input units
    pub k: f64,
}

impl DecayCurve {
    /// Score for input `x` (negative input is treated as zero)
    #[must_use]
    pub fn score(&self, x: f64) -> f64 {
        let x = x.max(0.0);
        (self.max - self.floor) * (-x / self.k).exp() + self.floor
    }
}

/// Token cost curve, k in tokens
pub const TOKEN_COST_CURVE: DecayCurve = DecayCurve {
    max: MAX_STARS,
    floor: MIN_STARS,
    k: 5_000.0,
};

/// Latency curve, k in milliseconds
pub const LATENCY_CURVE: DecayCurve = DecayCurve {
    max: MAX_STARS,
    floor: MIN_STARS,
    k: 30_000.0,
};

/// Token cost stars
#[must_use]
pub fn token_cost_score(total_tokens: u64) -> f64 {
    TOKEN_COST_CURVE.score(total_tokens as f64)
}

/// Latency stars
#[must_use]
pub fn latency_score(duration_ms: u64) -> f64 {
    LATENCY_CURVE.score(duration_ms as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input_is_max() {
        assert_eq!(token_cost_score(0), 5.0);
        assert_eq!(latency_score(0), 5.0);
    }

    #[test]
    fn test_latency_at_thirty_seconds() {
        let score = latency_score(30_000);
        assert!((score - 2.4715).abs() < 1e-3, "got {score}");
    }

    #[test]
    fn test_monotonic_and_bounded() {
        let mut last = f64::INFINITY;
        for tokens in [0u64, 10, 100, 1_000, 5_000, 20_000, 100_000, 10_000_000] {
            let score = token_cost_score(tokens);
            assert!(score <= last);
            assert!((1.0..=5.0).contains(&score));
            last = score;
        }
        assert!(token_cost_score(10_000_000) - 1.0 < 1e-6);
    }

    #[test]
    fn test_negative_input_clamped() {
        assert_eq!(TOKEN_COST_CURVE.score(-50.0), 5.0);
    }
}
