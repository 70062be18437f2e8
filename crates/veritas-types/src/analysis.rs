//! Typed per-phase analysis outputs.
//!
//! Each pipeline phase produces one of these structs instead of an untyped
//! map, so the decision engine's inputs are checked at compile time. All of
//! them serialize for inclusion in pipeline results and broker payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeritasError};
use crate::item::NewsItem;
use crate::verdict::{ConfidenceInterval, Verdict};

// ── Source analysis ─────────────────────────────────────────────────────

/// Coarse classification of a publishing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Wire services and dedicated news organizations.
    NewsAgency,
    /// Long-standing institutional media (.gov, .edu, .org).
    EstablishedMedia,
    /// Personal or small-group publications.
    Blog,
    /// Social platforms.
    SocialMedia,
    /// Could not be classified.
    Unknown,
}

/// Per-source facts derived from the item's URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Registered domain, lowercased, without a `www.` prefix.
    pub domain: String,
    /// The URL the domain was extracted from.
    pub url: String,
    /// Credibility prior in `[0, 1]`.
    pub credibility_score: f64,
    /// Source classification.
    pub source_type: SourceType,
    /// Whether credibility clears the verification bar (> 0.7).
    pub is_verified: bool,
}

/// Output of the source-tracking phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    /// Facts about the publishing source.
    pub source_info: SourceInfo,
    /// Credibility weighted by source type, in `[0, 1]`.
    pub authority_score: f64,
}

// ── Preprocessing ───────────────────────────────────────────────────────

/// Terminal classification of the preprocessing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessOutcome {
    /// The item passed the filters and was normalized.
    Processed,
    /// The item was seen recently; the pipeline short-circuits.
    Duplicate,
    /// The item matched spam heuristics; the pipeline short-circuits.
    Spam,
}

/// Output of the preprocessing phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessed {
    /// Whether the item proceeds, or why it stops.
    pub outcome: PreprocessOutcome,
    /// The normalized item (the original item for early exits).
    pub cleaned: NewsItem,
    /// Detected language code (`"en"`, `"tr"`, `"unknown"`).
    pub language: String,
}

// ── Content analysis ────────────────────────────────────────────────────

/// Output of the visual validation phase. Absent entirely when the item
/// carries no image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAnalysis {
    /// Image/text consistency estimate in `[0, 1]`.
    pub image_text_consistency: f64,
    /// Estimated probability the image is synthetic.
    pub deepfake_probability: f64,
    /// Estimated probability of manual manipulation.
    pub manipulation_probability: f64,
    /// Overall confidence that the visual content is authentic.
    pub confidence: f64,
    /// Convenience flag: `confidence < 0.5`.
    pub is_suspicious: bool,
}

/// Output of the textual context phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextualAnalysis {
    /// Headline/body inconsistencies found (numbers, dates).
    pub inconsistencies: Vec<String>,
    /// Emotional-manipulation categories detected.
    pub manipulation_indicators: Vec<String>,
    /// Whether the text attributes claims to any source.
    pub has_attribution: bool,
    /// Overall confidence that the text is trustworthy, in `[0, 1]`.
    pub overall_confidence: f64,
    /// Convenience flag: `overall_confidence < 0.5`.
    pub is_suspicious: bool,
}

// ── Debate ──────────────────────────────────────────────────────────────

/// Which side of the debate an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Argues the item is genuine.
    Supporting,
    /// Argues the item is fabricated.
    Opposing,
}

/// A generated debate argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Which side this argument takes.
    pub stance: Stance,
    /// The argument text.
    pub text: String,
}

impl Argument {
    /// Word count of the argument text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A rebuttal that consumes both debate arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refutation {
    /// The synthesized counter-argument text.
    pub counter_argument: String,
    /// Weakness categories found in the opposing argument.
    pub weaknesses: Vec<String>,
    /// Logical fallacies detected in the opposing argument.
    pub fallacies: Vec<String>,
    /// Confidence that the rebuttal holds, in `[0, 1]`.
    pub confidence: f64,
    /// Whether the rebuttal sides with the supporting argument.
    pub supports_claim: bool,
}

// ── Decision ────────────────────────────────────────────────────────────

/// The four named criteria the decision engine scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaScores {
    /// Strength of the evidence in the debate arguments.
    pub evidence_strength: f64,
    /// Credibility of the publishing source.
    pub source_credibility: f64,
    /// Relative quality of supporting vs. opposing arguments.
    pub argument_quality: f64,
    /// Agreement between visual and textual analyses.
    pub consistency_score: f64,
}

impl CriteriaScores {
    /// The scores as a fixed-order array (evidence, credibility, quality,
    /// consistency).
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.evidence_strength,
            self.source_credibility,
            self.argument_quality,
            self.consistency_score,
        ]
    }

    /// Reject scores that are not finite or lie outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("evidence_strength", self.evidence_strength),
            ("source_credibility", self.source_credibility),
            ("argument_quality", self.argument_quality),
            ("consistency_score", self.consistency_score),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(VeritasError::validation(format!(
                    "criterion {name} out of range: {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Weights applied to [`CriteriaScores`]. Conventionally sum to 1.0;
/// callers should [`normalize`](CriteriaWeights::normalize) after any
/// adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaWeights {
    /// Weight of evidence strength.
    pub evidence_strength: f64,
    /// Weight of source credibility.
    pub source_credibility: f64,
    /// Weight of argument quality.
    pub argument_quality: f64,
    /// Weight of the consistency score.
    pub consistency_score: f64,
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self {
            evidence_strength: 0.30,
            source_credibility: 0.25,
            argument_quality: 0.25,
            consistency_score: 0.20,
        }
    }
}

impl CriteriaWeights {
    /// The weights as a fixed-order array matching
    /// [`CriteriaScores::as_array`].
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.evidence_strength,
            self.source_credibility,
            self.argument_quality,
            self.consistency_score,
        ]
    }

    /// Rescale so the weights sum to 1.0.
    pub fn normalize(&self) -> Self {
        let sum: f64 = self.as_array().iter().sum();
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            evidence_strength: self.evidence_strength / sum,
            source_credibility: self.source_credibility / sum,
            argument_quality: self.argument_quality / sum,
            consistency_score: self.consistency_score / sum,
        }
    }

    /// Reject weights that are not finite, negative, or sum to zero.
    pub fn validate(&self) -> Result<()> {
        let arr = self.as_array();
        if arr.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(VeritasError::validation(
                "criteria weights must be finite and non-negative",
            ));
        }
        if arr.iter().sum::<f64>() <= 0.0 {
            return Err(VeritasError::validation(
                "criteria weights must not all be zero",
            ));
        }
        Ok(())
    }

    /// Weighted sum over the given scores.
    pub fn weighted_score(&self, scores: &CriteriaScores) -> f64 {
        let w = self.normalize();
        scores
            .as_array()
            .iter()
            .zip(w.as_array())
            .map(|(s, w)| s * w)
            .sum()
    }
}

/// The decision engine's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Final categorical verdict.
    pub verdict: Verdict,
    /// Weighted confidence in `[0, 1]` (the fact-check confidence when
    /// overridden).
    pub confidence: f64,
    /// Dispersion interval over the criteria scores.
    pub confidence_interval: ConfidenceInterval,
    /// Per-criterion scores; absent when an authoritative fact-check
    /// overrode heuristic scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_scores: Option<CriteriaScores>,
    /// Weights used for scoring; absent on override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<CriteriaWeights>,
    /// Human-readable justification.
    pub rationale: String,
}

// ── Meta evaluation ─────────────────────────────────────────────────────

/// Severity of a detected bias or error pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth reviewing.
    Medium,
    /// Should block acceptance.
    High,
}

/// A single finding from the meta-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Pattern identifier (e.g. `overconfidence`).
    pub kind: String,
    /// How serious the finding is.
    pub severity: Severity,
    /// Explanation.
    pub description: String,
}

/// What the meta-evaluator recommends doing with the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaRecommendation {
    /// The decision stands.
    Accept,
    /// The decision should be manually reviewed.
    Review,
    /// The decision should be rejected.
    Reject,
}

/// Output of the meta-evaluation of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEvaluation {
    /// Detected decision biases.
    pub biases: Vec<Finding>,
    /// Detected error patterns across the analyses.
    pub error_patterns: Vec<Finding>,
    /// Calibration quality of the confidence interval, in `[0, 1]`.
    pub calibration_score: f64,
    /// Suggested improvements, human-readable.
    pub improvements: Vec<String>,
    /// The meta-verdict on the decision itself.
    pub recommendation: MetaRecommendation,
    /// Aggregate decision quality in `[0, 1]`.
    pub overall_quality: f64,
}

// ── Correction ──────────────────────────────────────────────────────────

/// Correction artifact synthesized when an item is judged FAKE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// The claim that was judged false.
    pub original_claim: String,
    /// Corrected headline text.
    pub corrected_headline: String,
    /// Why the claim is considered false.
    pub explanation: String,
    /// Media-literacy guidance for readers.
    pub educational_tips: Vec<String>,
    /// Red flags present in the original item.
    pub red_flags: Vec<String>,
}

/// Named criteria scores as a map, for reporting surfaces that want
/// string keys (CLI output, broker payloads).
impl From<CriteriaScores> for BTreeMap<String, f64> {
    fn from(s: CriteriaScores) -> Self {
        BTreeMap::from([
            ("evidence_strength".to_string(), s.evidence_strength),
            ("source_credibility".to_string(), s.source_credibility),
            ("argument_quality".to_string(), s.argument_quality),
            ("consistency_score".to_string(), s.consistency_score),
        ])
    }
}
