//! Verdicts and confidence intervals.

use serde::{Deserialize, Serialize};

/// Final categorical verdict on a news item.
///
/// Wire form is the uppercase string (`"REAL"`, `"FAKE"`, `"UNSURE"`).
/// [`Verdict::Unsure`] is the safe default for ambiguous inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The item is judged genuine.
    Real,
    /// The item is judged fabricated or misleading.
    Fake,
    /// The evidence does not support a definitive call.
    #[default]
    Unsure,
}

impl Verdict {
    /// Ordering used by monotonicity checks: FAKE < UNSURE < REAL.
    pub fn rank(self) -> u8 {
        match self {
            Verdict::Fake => 0,
            Verdict::Unsure => 1,
            Verdict::Real => 2,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Real => "REAL",
            Verdict::Fake => "FAKE",
            Verdict::Unsure => "UNSURE",
        };
        f.write_str(s)
    }
}

/// Dispersion-based confidence interval over criteria scores.
///
/// Both bounds are clamped to `[0, 1]` and `lower <= upper` holds for
/// every value constructed through [`ConfidenceInterval::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound, in `[0, 1]`.
    pub lower: f64,
    /// Upper bound, in `[0, 1]`, never below `lower`.
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Build an interval, clamping both bounds to `[0, 1]` and ordering
    /// them so that `lower <= upper`. Non-finite inputs collapse to the
    /// full `[0, 1]` interval.
    pub fn new(lower: f64, upper: f64) -> Self {
        if !lower.is_finite() || !upper.is_finite() {
            return Self {
                lower: 0.0,
                upper: 1.0,
            };
        }
        let lower = lower.clamp(0.0, 1.0);
        let upper = upper.clamp(0.0, 1.0);
        if lower <= upper {
            Self { lower, upper }
        } else {
            Self {
                lower: upper,
                upper: lower,
            }
        }
    }

    /// Interval `[mean - stddev, mean + stddev]` over the given scores
    /// (population standard deviation), clamped to `[0, 1]`.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                lower: 0.0,
                upper: 1.0,
            };
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance =
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        let stddev = variance.sqrt();
        Self::new(mean - stddev, mean + stddev)
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl Default for ConfidenceInterval {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }
}
