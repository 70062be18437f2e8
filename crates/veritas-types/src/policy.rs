//! Verdict threshold policies.
//!
//! A [`ThresholdPolicy`] is an explicit value selected once at decision
//! engine construction, rather than probed from a side file on every call.
//! Two variants exist; the trainer's persisted adjustments pick between
//! them. Both keep the same three-tier structure: a strong REAL tier, a
//! moderate REAL tier, a FAKE cutoff, and UNSURE as the safe default for
//! the ambiguous middle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::verdict::{ConfidenceInterval, Verdict};

/// The trainer's adjustment value that switches the judge to the
/// sensitive threshold table.
pub const INCREASE_SENSITIVITY: &str = "increase_sensitivity";

/// Key under which the judge's threshold adjustment is persisted.
pub const THRESHOLD_ADJUSTMENT_KEY: &str = "threshold_adjustment";

/// Which threshold table the decision engine uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// The default table.
    #[default]
    Normal,
    /// Looser REAL tiers and a wider FAKE band, applied when the trainer
    /// has recorded an `increase_sensitivity` adjustment for the judge.
    Sensitive,
}

/// Concrete cutoffs for one policy variant.
///
/// REAL requires both a minimum weighted score and a minimum interval
/// lower bound; FAKE triggers on a low score or a low interval upper
/// bound combined with a sub-midpoint score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    /// Strong REAL tier: minimum weighted score.
    pub strong_score: f64,
    /// Strong REAL tier: minimum interval lower bound.
    pub strong_lower: f64,
    /// Moderate REAL tier: minimum weighted score.
    pub moderate_score: f64,
    /// Moderate REAL tier: minimum interval lower bound.
    pub moderate_lower: f64,
    /// FAKE when the weighted score is at or below this.
    pub fake_score: f64,
    /// FAKE when the interval upper bound is at or below this and the
    /// score sits below it too.
    pub fake_upper: f64,
}

impl ThresholdPolicy {
    /// The cutoff table for this variant.
    pub fn table(&self) -> ThresholdTable {
        match self {
            ThresholdPolicy::Normal => ThresholdTable {
                strong_score: 0.70,
                strong_lower: 0.60,
                moderate_score: 0.60,
                moderate_lower: 0.50,
                fake_score: 0.40,
                fake_upper: 0.50,
            },
            ThresholdPolicy::Sensitive => ThresholdTable {
                strong_score: 0.65,
                strong_lower: 0.55,
                moderate_score: 0.55,
                moderate_lower: 0.45,
                fake_score: 0.45,
                fake_upper: 0.50,
            },
        }
    }

    /// Map a weighted score and its confidence interval to a verdict.
    pub fn verdict(&self, score: f64, interval: ConfidenceInterval) -> Verdict {
        let t = self.table();
        if score >= t.strong_score && interval.lower >= t.strong_lower {
            return Verdict::Real;
        }
        if score >= t.moderate_score && interval.lower >= t.moderate_lower {
            return Verdict::Real;
        }
        if score <= t.fake_score || (interval.upper <= t.fake_upper && score < t.fake_upper) {
            return Verdict::Fake;
        }
        Verdict::Unsure
    }

    /// Select the policy implied by a persisted per-agent adjustment bag
    /// (the judge's entry in the training file). Anything other than an
    /// explicit `increase_sensitivity` string keeps the normal table.
    pub fn from_adjustments(adjustments: Option<&BTreeMap<String, Value>>) -> Self {
        match adjustments.and_then(|m| m.get(THRESHOLD_ADJUSTMENT_KEY)) {
            Some(Value::String(s)) if s == INCREASE_SENSITIVITY => ThresholdPolicy::Sensitive,
            _ => ThresholdPolicy::Normal,
        }
    }
}
