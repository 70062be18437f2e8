//! The decision engine.
//!
//! Scores four named criteria over whatever inputs the pipeline produced,
//! combines them into a weighted score with a dispersion interval, and maps
//! the pair to a verdict through the configured [`ThresholdPolicy`]. An
//! authoritative upstream fact-check bypasses scoring entirely.
//!
//! Missing inputs never fail a decision; each criterion substitutes a
//! neutral 0.5 for evidence it cannot see. Malformed inputs (weights or
//! confidences outside their contracts) do fail, with a validation error.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use veritas_types::{
    ConfidenceInterval, CriteriaScores, CriteriaWeights, Decision, MessageKind, Refutation,
    Result, Targets, ThresholdPolicy, VeritasError,
};

use crate::agents::{AnalysisSet, Decider, JudgeInput, ids};
use crate::broker::MessageBroker;

/// Phrases that mark an argument as citing evidence.
const EVIDENCE_MARKERS: [&str; 4] = ["evidence", "source", "data", "according"];

/// Hedging vocabulary that weakens a challenge.
const HEDGES: [&str; 4] = ["might", "could", "possibly", "unverified"];

/// Phrases that mark a challenge as claiming hard proof.
const PROOF_MARKERS: [&str; 3] = ["evidence", "proof", "verified"];

/// Weighted multi-criteria decision engine.
pub struct JudgeAgent {
    broker: Arc<MessageBroker>,
    policy: ThresholdPolicy,
    weights: CriteriaWeights,
}

impl JudgeAgent {
    /// Judge with the normal threshold table and default weights.
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self {
            broker,
            policy: ThresholdPolicy::default(),
            weights: CriteriaWeights::default(),
        }
    }

    /// Replace the threshold policy.
    pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the criteria weights.
    pub fn with_weights(mut self, weights: CriteriaWeights) -> Self {
        self.weights = weights;
        self
    }

    /// The active threshold policy.
    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    fn publish_decision(&self, decision: &Decision) {
        let message = self.broker.create_message(
            ids::JA,
            MessageKind::Decision,
            json!({
                "verdict": decision.verdict,
                "confidence": decision.confidence,
                "confidence_interval": decision.confidence_interval,
                "rationale": decision.rationale,
            }),
            Targets::agents([ids::MEA, ids::COA]),
        );
        self.broker.publish(message);
    }
}

impl Decider for JudgeAgent {
    fn decide(&self, input: &JudgeInput) -> Result<Decision> {
        self.weights.validate()?;

        // An authoritative fact-check short-circuits heuristic scoring.
        if let Some(fc) = input.item.as_ref().and_then(|i| i.fact_check.as_ref()) {
            if !fc.confidence.is_finite() || !(0.0..=1.0).contains(&fc.confidence) {
                return Err(VeritasError::validation(format!(
                    "fact-check confidence out of range: {}",
                    fc.confidence
                )));
            }
            let confidence = fc.confidence.max(0.90);
            let decision = Decision {
                verdict: fc.verdict,
                confidence,
                confidence_interval: ConfidenceInterval::new(confidence - 0.05, confidence),
                criteria_scores: None,
                weights: None,
                rationale: format!(
                    "Verdict: {}. Overridden by authoritative fact-check from {}.",
                    fc.verdict,
                    if fc.source.is_empty() { "an upstream checker" } else { &fc.source }
                ),
            };
            info!(verdict = %decision.verdict, source = %fc.source, "fact-check override");
            self.publish_decision(&decision);
            return Ok(decision);
        }

        let scores = CriteriaScores {
            evidence_strength: evidence_strength(input),
            source_credibility: source_credibility(&input.analyses),
            argument_quality: argument_quality(input),
            consistency_score: consistency(&input.analyses),
        };
        scores.validate()?;

        let confidence = self.weights.weighted_score(&scores);
        let confidence_interval = ConfidenceInterval::from_scores(&scores.as_array());
        let verdict = self.policy.verdict(confidence, confidence_interval);

        debug!(
            %verdict,
            confidence,
            lower = confidence_interval.lower,
            upper = confidence_interval.upper,
            "decision computed"
        );

        let decision = Decision {
            verdict,
            confidence,
            confidence_interval,
            rationale: format!(
                "Verdict: {verdict}. evidence_strength: {:.2}, source_credibility: {:.2}, \
                 argument_quality: {:.2}, consistency_score: {:.2}.",
                scores.evidence_strength,
                scores.source_credibility,
                scores.argument_quality,
                scores.consistency_score
            ),
            criteria_scores: Some(scores),
            weights: Some(self.weights),
        };
        self.publish_decision(&decision);
        Ok(decision)
    }
}

// ── Criteria ────────────────────────────────────────────────────────────

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|m| lowered.contains(m))
}

/// How well the supporting side is evidenced, from a 0.5 base.
fn evidence_strength(input: &JudgeInput) -> f64 {
    let mut score: f64 = 0.5;
    if let Some(claim) = &input.claim {
        if claim.word_count() > 20 {
            score += 0.1;
        }
        if contains_any(&claim.text, &EVIDENCE_MARKERS) {
            score += 0.1;
        }
    }
    if let Some(challenge) = &input.challenge {
        if contains_any(&challenge.text, &HEDGES) {
            score += 0.1;
        }
    }
    if let Some(Refutation {
        confidence,
        supports_claim: true,
        ..
    }) = &input.refutation
    {
        if *confidence > 0.6 {
            score += 0.1;
        }
    }
    score.clamp(0.0, 1.0)
}

/// Mean of the source's credibility prior and its type-weighted authority.
fn source_credibility(analyses: &AnalysisSet) -> f64 {
    match &analyses.source {
        Some(s) => {
            ((s.source_info.credibility_score + s.authority_score) / 2.0).clamp(0.0, 1.0)
        }
        None => 0.5,
    }
}

/// Relative quality of the supporting argument against the challenge.
fn argument_quality(input: &JudgeInput) -> f64 {
    let mut score: f64 = 0.5;
    if let Some(claim) = &input.claim {
        if claim.word_count() > 15 {
            score += 0.1;
        }
        if contains_any(&claim.text, &["because", "evidence", "source", "data"]) {
            score += 0.1;
        }
    }
    if let Some(challenge) = &input.challenge {
        if challenge.word_count() > 20 {
            score -= 0.1;
        }
        if contains_any(&challenge.text, &PROOF_MARKERS) {
            score -= 0.1;
        }
    }
    if let Some(refutation) = &input.refutation {
        if refutation.supports_claim && refutation.confidence > 0.7 {
            score += 0.1;
        }
    }
    score.clamp(0.0, 1.0)
}

/// Agreement between the visual and textual analyses. Neutral when
/// neither exists.
fn consistency(analyses: &AnalysisSet) -> f64 {
    let mut values = Vec::with_capacity(2);
    if let Some(v) = &analyses.visual {
        values.push(v.confidence);
    }
    if let Some(t) = &analyses.textual {
        values.push(t.overall_confidence);
    }
    if values.is_empty() {
        0.5
    } else {
        (values.iter().sum::<f64>() / values.len() as f64).clamp(0.0, 1.0)
    }
}

/// Bump every criterion-relevant input so each criterion score can only
/// move up (used by tests probing verdict monotonicity).
#[cfg(test)]
pub(crate) fn uniform_increment(scores: &CriteriaScores, delta: f64) -> CriteriaScores {
    CriteriaScores {
        evidence_strength: (scores.evidence_strength + delta).clamp(0.0, 1.0),
        source_credibility: (scores.source_credibility + delta).clamp(0.0, 1.0),
        argument_quality: (scores.argument_quality + delta).clamp(0.0, 1.0),
        consistency_score: (scores.consistency_score + delta).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_types::{
        Argument, FactCheck, NewsItem, SourceAnalysis, SourceInfo, SourceType, Stance,
        TextualAnalysis, Verdict, VisualAnalysis,
    };

    fn judge() -> JudgeAgent {
        JudgeAgent::new(Arc::new(MessageBroker::new()))
    }

    fn strong_input() -> JudgeInput {
        JudgeInput {
            item: Some(NewsItem::new("001", "h", "t")),
            claim: Some(Argument {
                stance: Stance::Supporting,
                text: "The evidence is strong because the source published data and the \
                       account is attributed, according to officials who confirmed it on \
                       the record yesterday."
                    .into(),
            }),
            challenge: Some(Argument {
                stance: Stance::Opposing,
                text: "This might possibly be unverified.".into(),
            }),
            refutation: Some(Refutation {
                counter_argument: String::new(),
                weaknesses: vec!["speculative language".into()],
                fallacies: vec![],
                confidence: 0.85,
                supports_claim: true,
            }),
            analyses: AnalysisSet {
                visual: Some(VisualAnalysis {
                    image_text_consistency: 0.8,
                    deepfake_probability: 0.05,
                    manipulation_probability: 0.1,
                    confidence: 0.75,
                    is_suspicious: false,
                }),
                textual: Some(TextualAnalysis {
                    inconsistencies: vec![],
                    manipulation_indicators: vec![],
                    has_attribution: true,
                    overall_confidence: 0.9,
                    is_suspicious: false,
                }),
                source: Some(SourceAnalysis {
                    source_info: SourceInfo {
                        domain: "reuters.com".into(),
                        url: "https://reuters.com/x".into(),
                        credibility_score: 0.95,
                        source_type: SourceType::NewsAgency,
                        is_verified: true,
                    },
                    authority_score: 0.95,
                }),
            },
        }
    }

    #[test]
    fn decisions_are_deterministic() {
        let judge = judge();
        let input = strong_input();
        let a = judge.decide(&input).unwrap();
        let b = judge.decide(&input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn strong_input_yields_real() {
        let decision = judge().decide(&strong_input()).unwrap();
        assert_eq!(decision.verdict, Verdict::Real);
        let scores = decision.criteria_scores.unwrap();
        // Hedged challenge, evidenced claim, supportive refutation.
        assert!((scores.evidence_strength - 0.9).abs() < 1e-9);
        assert!((scores.source_credibility - 0.95).abs() < 1e-9);
        // The hedged challenge still claims verification, docking quality.
        assert!((scores.argument_quality - 0.7).abs() < 1e-9);
        assert!((scores.consistency_score - 0.825).abs() < 1e-9);
    }

    #[test]
    fn interval_always_contains_ordered_unit_bounds() {
        let decision = judge().decide(&strong_input()).unwrap();
        let ci = decision.confidence_interval;
        assert!(0.0 <= ci.lower && ci.lower <= ci.upper && ci.upper <= 1.0);
    }

    #[test]
    fn empty_input_is_neutral_unsure() {
        let decision = judge().decide(&JudgeInput::default()).unwrap();
        let scores = decision.criteria_scores.unwrap();
        assert_eq!(scores.as_array(), [0.5, 0.5, 0.5, 0.5]);
        assert_eq!(decision.verdict, Verdict::Unsure);
        assert!((decision.confidence - 0.5).abs() < 1e-9);
        // Identical criteria give a degenerate interval.
        assert!(decision.confidence_interval.width() < 1e-9);
    }

    #[test]
    fn fact_check_overrides_scoring() {
        let mut input = strong_input();
        input.item.as_mut().unwrap().fact_check = Some(FactCheck {
            verdict: Verdict::Fake,
            confidence: 0.8,
            source: "factcheck.example".into(),
        });
        let decision = judge().decide(&input).unwrap();
        assert_eq!(decision.verdict, Verdict::Fake);
        // Low upstream confidence is floored at 0.90.
        assert!((decision.confidence - 0.90).abs() < 1e-9);
        assert!(decision.criteria_scores.is_none());
        assert!(decision.weights.is_none());
        assert!(decision.rationale.contains("factcheck.example"));
    }

    #[test]
    fn fact_check_with_higher_confidence_keeps_it() {
        let mut input = JudgeInput::for_item(NewsItem::new("001", "h", "t"));
        input.item.as_mut().unwrap().fact_check = Some(FactCheck {
            verdict: Verdict::Real,
            confidence: 0.97,
            source: String::new(),
        });
        let decision = judge().decide(&input).unwrap();
        assert!((decision.confidence - 0.97).abs() < 1e-9);
    }

    #[test]
    fn invalid_fact_check_confidence_is_rejected() {
        let mut input = JudgeInput::for_item(NewsItem::new("001", "h", "t"));
        input.item.as_mut().unwrap().fact_check = Some(FactCheck {
            verdict: Verdict::Fake,
            confidence: 1.4,
            source: String::new(),
        });
        let err = judge().decide(&input).unwrap_err();
        assert!(matches!(err, VeritasError::Validation { .. }));
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let judge = judge().with_weights(CriteriaWeights {
            evidence_strength: -1.0,
            ..CriteriaWeights::default()
        });
        let err = judge.decide(&JudgeInput::default()).unwrap_err();
        assert!(matches!(err, VeritasError::Validation { .. }));
    }

    #[test]
    fn verdict_never_degrades_under_uniform_criteria_increase() {
        let policy = ThresholdPolicy::Normal;
        let base = CriteriaScores {
            evidence_strength: 0.62,
            source_credibility: 0.68,
            argument_quality: 0.58,
            consistency_score: 0.66,
        };
        let weights = CriteriaWeights::default();
        let mut previous_rank = 0;
        for step in 0..=20 {
            let scores = uniform_increment(&base, step as f64 * 0.02);
            let score = weights.weighted_score(&scores);
            let interval = ConfidenceInterval::from_scores(&scores.as_array());
            let rank = policy.verdict(score, interval).rank();
            assert!(
                rank >= previous_rank,
                "verdict degraded at step {step}: rank {rank} < {previous_rank}"
            );
            previous_rank = rank;
        }
    }

    #[test]
    fn sensitive_policy_accepts_weaker_real_cases() {
        let input = JudgeInput {
            challenge: Some(Argument {
                stance: Stance::Opposing,
                text: "This might be wrong.".into(),
            }),
            analyses: AnalysisSet {
                source: Some(SourceAnalysis {
                    source_info: SourceInfo {
                        domain: "example.org".into(),
                        url: "https://example.org".into(),
                        credibility_score: 0.65,
                        source_type: SourceType::EstablishedMedia,
                        is_verified: false,
                    },
                    authority_score: 0.585,
                }),
                textual: Some(TextualAnalysis {
                    inconsistencies: vec![],
                    manipulation_indicators: vec![],
                    has_attribution: true,
                    overall_confidence: 0.9,
                    is_suspicious: false,
                }),
                visual: None,
            },
            ..JudgeInput::default()
        };
        let broker = Arc::new(MessageBroker::new());
        let normal = JudgeAgent::new(broker.clone()).decide(&input).unwrap();
        let sensitive = JudgeAgent::new(broker)
            .with_policy(ThresholdPolicy::Sensitive)
            .decide(&input)
            .unwrap();
        assert!(sensitive.verdict.rank() >= normal.verdict.rank());
    }

    #[test]
    fn decision_is_published_to_meta_and_correction() {
        let broker = Arc::new(MessageBroker::new());
        let judge = JudgeAgent::new(broker.clone());
        judge.decide(&JudgeInput::default()).unwrap();
        assert_eq!(
            broker.messages_for(ids::MEA, Some(MessageKind::Decision)).len(),
            1
        );
        assert_eq!(
            broker.messages_for(ids::COA, Some(MessageKind::Decision)).len(),
            1
        );
    }
}
